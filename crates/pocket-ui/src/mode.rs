#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    #[default]
    GpsDisplay,
    MapDisplay,
    DistanceCalc,
    Settings,
    About,
}

impl DisplayMode {
    pub const ALL: [DisplayMode; 5] = [
        DisplayMode::GpsDisplay,
        DisplayMode::MapDisplay,
        DisplayMode::DistanceCalc,
        DisplayMode::Settings,
        DisplayMode::About,
    ];

    /// Next mode in cyclic order.
    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|m| *m == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }
}
