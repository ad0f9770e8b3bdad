use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static HEX_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$")
        .expect("hex color pattern compiles")
});

/// RGBA color parsed from `#RGB`, `#RRGGBB` or `#RRGGBBAA`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Parse a hex color string; `None` when it is not one
    pub fn parse_hex(value: &str) -> Option<Self> {
        let value = value.trim();
        if !HEX_COLOR.is_match(value) {
            return None;
        }

        let digits = &value[1..];
        let channel = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();

        match digits.len() {
            3 => {
                let short = |i: usize| {
                    u8::from_str_radix(&digits[i..i + 1], 16)
                        .ok()
                        .map(|v| v * 17)
                };
                Some(Self::rgb(short(0)?, short(1)?, short(2)?))
            }
            6 => Some(Self::rgb(channel(0)?, channel(2)?, channel(4)?)),
            _ => Some(Self {
                r: channel(0)?,
                g: channel(2)?,
                b: channel(4)?,
                a: channel(6)?,
            }),
        }
    }

    pub fn to_rgba(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Channels scaled to 0.0..=1.0 for PostScript and PDF operators
    pub fn unit_rgb(self) -> (f32, f32, f32) {
        (
            f32::from(self.r) / 255.0,
            f32::from(self.g) / 255.0,
            f32::from(self.b) / 255.0,
        )
    }

    pub fn opacity(self) -> f32 {
        f32::from(self.a) / 255.0
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02X}", self.a)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_long_and_short_forms() {
        assert_eq!(Color::parse_hex("#000000"), Some(Color::BLACK));
        assert_eq!(Color::parse_hex("#fff"), Some(Color::WHITE));
        assert_eq!(Color::parse_hex("#FF8000"), Some(Color::rgb(255, 128, 0)));
        assert_eq!(
            Color::parse_hex("#11223380"),
            Some(Color {
                r: 0x11,
                g: 0x22,
                b: 0x33,
                a: 0x80
            })
        );
    }

    #[test]
    fn test_rejects_non_hex_values() {
        for value in ["", "000000", "#12", "#12345", "#GGGGGG", "red", "#0000000"] {
            assert_eq!(Color::parse_hex(value), None, "{value} should be rejected");
        }
    }

    #[test]
    fn test_display_round_trips_to_hex() {
        assert_eq!(Color::rgb(255, 128, 0).to_string(), "#FF8000");
        assert_eq!(Color::parse_hex("#11223380").unwrap().to_string(), "#11223380");
    }
}
