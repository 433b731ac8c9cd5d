// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use cliclack::{Theme, ThemeState};
use console::Style;

/// Styles of the report body.
#[derive(Clone, Debug)]
pub struct Palette {
    pub heading: Style,
    pub pass: Style,
    pub fail: Style,
    pub dim: Style,
}

impl Palette {
    pub fn new(colors: bool) -> Self {
        let palette = Self {
            heading: Style::new().magenta().bold(),
            pass: Style::new().green(),
            fail: Style::new().red().bold(),
            dim: Style::new().dim(),
        };
        if colors {
            palette
        } else {
            Self {
                heading: palette.heading.force_styling(false),
                pass: palette.pass.force_styling(false),
                fail: palette.fail.force_styling(false),
                dim: palette.dim.force_styling(false),
            }
        }
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new(console::colors_enabled())
    }
}

/// Prompt theme that draws with the same [`Palette`] as the report, so a
/// failed run's outro and its symbols share one colour.
pub struct BenchTheme {
    palette: Palette,
}

impl BenchTheme {
    pub fn new(palette: Palette) -> Self {
        Self { palette }
    }
}

impl Theme for BenchTheme {
    fn bar_color(&self, _: &ThemeState) -> Style {
        self.palette.dim.clone().bold()
    }

    fn state_symbol_color(&self, state: &ThemeState) -> Style {
        match state {
            ThemeState::Error(_) | ThemeState::Cancel => self.palette.fail.clone(),
            ThemeState::Submit => self.palette.pass.clone(),
            ThemeState::Active => self.palette.heading.clone(),
        }
    }

    fn info_symbol(&self) -> String {
        "⚛".into()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn theme_follows_palette() {
        let palette = Palette::new(true);
        let theme = BenchTheme::new(palette.clone());
        let cases = [
            (ThemeState::Active, &palette.heading),
            (ThemeState::Submit, &palette.pass),
            (ThemeState::Cancel, &palette.fail),
            (ThemeState::Error("bad".into()), &palette.fail),
        ];
        for (state, expected) in cases {
            assert_eq!(&theme.state_symbol_color(&state), expected);
        }
        assert_eq!(
            theme.bar_color(&ThemeState::Submit),
            palette.dim.clone().bold()
        );
    }

    #[test]
    fn plain_palette_keeps_theme_plain() {
        let theme = BenchTheme::new(Palette::new(false));
        let symbol = theme.state_symbol_color(&ThemeState::Active);
        assert_eq!(symbol.apply_to("x").to_string(), "x");
        assert_eq!(theme.bar_color(&ThemeState::Active).apply_to("x").to_string(), "x");
    }
}
