use session::PlayerColor;

/// Hands out distinct player colors in join order.
#[derive(Debug)]
pub struct PlayerColorAssigner {
    available_colors: Vec<PlayerColor>,
    next_index: usize,
}

impl PlayerColorAssigner {
    pub fn new() -> Self {
        Self {
            available_colors: vec![
                PlayerColor::rgb(0xe5, 0x3e, 0x3e), // Red
                PlayerColor::rgb(0x31, 0x82, 0xce), // Blue
                PlayerColor::rgb(0x38, 0xa1, 0x69), // Green
                PlayerColor::rgb(0xec, 0xc9, 0x4b), // Yellow
                PlayerColor::rgb(0xdd, 0x6b, 0x20), // Orange
                PlayerColor::rgb(0x80, 0x5a, 0xd5), // Purple
                PlayerColor::rgb(0xd5, 0x3f, 0x8c), // Magenta
                PlayerColor::rgb(0xf6, 0x87, 0xb3), // Pink
            ],
            next_index: 0,
        }
    }

    /// Assigns the next color from the palette (wraps around if needed).
    pub fn next_color(&mut self) -> PlayerColor {
        let color = self.available_colors[self.next_index];
        self.next_index = (self.next_index + 1) % self.available_colors.len();
        color
    }
}

impl Default for PlayerColorAssigner {
    fn default() -> Self {
        Self::new()
    }
}
