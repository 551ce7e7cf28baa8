//! Input planner: turns an input descriptor into the ordered, delay-separated key
//! presses that walk the on-screen menus to that input.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use tracing::warn;

use crate::device::Key;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Tv,
    App,
    Source,
    Channel,
    #[default]
    Generic,
}

/// Type names are case-insensitive; anything unrecognised is generic.
impl<'de> Deserialize<'de> for InputType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Ok(match name.to_ascii_lowercase().as_str() {
            "tv" => InputType::Tv,
            "app" => InputType::App,
            "source" => InputType::Source,
            "channel" => InputType::Channel,
            "generic" => InputType::Generic,
            _ => {
                warn!("Unknown input type '{}', treating it as generic", name);
                InputType::Generic
            }
        })
    }
}

/// A configured input, referenced by its index in the configured list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputDescriptor {
    pub name: String,

    /// Channel number for [`InputType::Channel`], signed cursor distance otherwise.
    #[serde(default)]
    pub position: i64,

    #[serde(rename = "type", default)]
    pub kind: InputType,

    #[serde(default)]
    pub expose_as_switch: bool,
}

/// Longest cursor walk a plan will contain, in either direction.
pub const MAX_CURSOR_STEPS: i64 = 100;

/// One key press and the settle time before the next press is safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyAction {
    pub key: Key,
    pub post_delay: Duration,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationPlan(Vec<KeyAction>);

impl NavigationPlan {
    pub fn actions(&self) -> &[KeyAction] {
        &self.0
    }

    pub fn keys(&self) -> Vec<Key> {
        self.0.iter().map(|action| action.key).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a NavigationPlan {
    type Item = &'a KeyAction;
    type IntoIter = std::slice::Iter<'a, KeyAction>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for NavigationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, action) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{}+{}ms", action.key, action.post_delay.as_millis())?;
        }
        Ok(())
    }
}

/// Build the navigation plan for `input`.
///
/// TV inputs are a single `WatchTV` press. Everything else is an optional prefix
/// (`Home` for apps, `WatchTV Source CursorDown` for sources, `WatchTV` plus one
/// digit per decimal digit for channels), then a cursor walk of `position` steps for
/// every type except channels, then `Confirm`.
///
/// The cursor walk runs after the app and source prefixes too; only channels skip it.
/// It is capped at [`MAX_CURSOR_STEPS`].
pub fn plan(
    input: &InputDescriptor,
    has_no_channels: bool,
    inter_key_delay: Duration,
    channel_popup_delay: Duration,
) -> NavigationPlan {
    if input.kind == InputType::Tv {
        return NavigationPlan(vec![KeyAction {
            key: Key::WatchTV,
            post_delay: inter_key_delay,
        }]);
    }

    let mut keys = Vec::new();

    match input.kind {
        InputType::App => keys.push(Key::Home),
        InputType::Source => keys.extend([Key::WatchTV, Key::Source, Key::CursorDown]),
        _ => {}
    }

    if input.kind == InputType::Channel {
        keys.push(Key::WatchTV);
        keys.extend(
            input
                .position
                .unsigned_abs()
                .to_string()
                .chars()
                .filter_map(|c| c.to_digit(10))
                .filter_map(Key::digit),
        );
    } else {
        let mut steps = input.position.clamp(-MAX_CURSOR_STEPS, MAX_CURSOR_STEPS);
        while steps != 0 {
            if steps > 0 {
                keys.push(Key::CursorRight);
                steps -= 1;
            } else {
                keys.push(Key::CursorLeft);
                steps += 1;
            }
        }
    }

    keys.push(Key::Confirm);

    let watch_tv_delay = if has_no_channels {
        channel_popup_delay
    } else {
        inter_key_delay
    };

    NavigationPlan(
        keys.into_iter()
            .map(|key| KeyAction {
                key,
                post_delay: if key == Key::WatchTV {
                    watch_tv_delay
                } else {
                    inter_key_delay
                },
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(600);
    const POPUP: Duration = Duration::from_millis(5000);

    fn input(kind: InputType, position: i64) -> InputDescriptor {
        InputDescriptor {
            name: format!("{kind:?} {position}"),
            position,
            kind,
            expose_as_switch: false,
        }
    }

    #[test]
    fn test_tv_is_single_watch_tv() {
        for has_no_channels in [false, true] {
            for position in [-4, 0, 7] {
                let plan = plan(&input(InputType::Tv, position), has_no_channels, DELAY, POPUP);
                assert_eq!(plan.keys(), vec![Key::WatchTV]);
            }
        }
    }

    #[test]
    fn test_channel_digits_with_channels_installed() {
        let plan = plan(&input(InputType::Channel, 204), false, DELAY, POPUP);
        insta::assert_snapshot!(plan, @"WatchTV+600ms Digit2+600ms Digit0+600ms Digit4+600ms Confirm+600ms");
    }

    #[test]
    fn test_channel_digits_wait_for_setup_popup() {
        let plan = plan(&input(InputType::Channel, 204), true, DELAY, POPUP);
        insta::assert_snapshot!(plan, @"WatchTV+5000ms Digit2+600ms Digit0+600ms Digit4+600ms Confirm+600ms");
    }

    #[test]
    fn test_negative_channel_uses_absolute_value() {
        let plan = plan(&input(InputType::Channel, -31), false, DELAY, POPUP);
        assert_eq!(
            plan.keys(),
            vec![Key::WatchTV, Key::Digit3, Key::Digit1, Key::Confirm]
        );
    }

    #[test]
    fn test_channel_zero() {
        let plan = plan(&input(InputType::Channel, 0), false, DELAY, POPUP);
        assert_eq!(plan.keys(), vec![Key::WatchTV, Key::Digit0, Key::Confirm]);
    }

    #[test]
    fn test_app_at_origin() {
        let plan = plan(&input(InputType::App, 0), false, DELAY, POPUP);
        assert_eq!(plan.keys(), vec![Key::Home, Key::Confirm]);
    }

    #[test]
    fn test_generic_walks_left() {
        let plan = plan(&input(InputType::Generic, -3), false, DELAY, POPUP);
        assert_eq!(
            plan.keys(),
            vec![Key::CursorLeft, Key::CursorLeft, Key::CursorLeft, Key::Confirm]
        );
        assert!(plan.actions().iter().all(|a| a.post_delay == DELAY));
    }

    #[test]
    fn test_app_prefix_is_followed_by_cursor_walk() {
        let plan = plan(&input(InputType::App, 2), false, DELAY, POPUP);
        assert_eq!(
            plan.keys(),
            vec![Key::Home, Key::CursorRight, Key::CursorRight, Key::Confirm]
        );
    }

    #[test]
    fn test_source_prefix_is_followed_by_cursor_walk() {
        let plan = plan(&input(InputType::Source, 1), true, DELAY, POPUP);
        insta::assert_snapshot!(plan, @"WatchTV+5000ms Source+600ms CursorDown+600ms CursorRight+600ms Confirm+600ms");
    }

    #[test]
    fn test_cursor_walk_is_capped() {
        let walk = plan(&input(InputType::Generic, -1_000_000_000_000), false, DELAY, POPUP);
        assert_eq!(walk.len(), MAX_CURSOR_STEPS as usize + 1);
        assert_eq!(walk.keys().last(), Some(&Key::Confirm));

        // Channel numbers are digits, not steps
        let digits = plan(&input(InputType::Channel, 1_000_000_000_000), false, DELAY, POPUP);
        assert_eq!(digits.len(), 15);
    }

    #[test]
    fn test_plans_are_deterministic() {
        let fixtures = [
            input(InputType::Tv, 0),
            input(InputType::App, 3),
            input(InputType::App, -2),
            input(InputType::Source, 2),
            input(InputType::Channel, 1001),
            input(InputType::Generic, 0),
            input(InputType::Generic, 5),
        ];

        for fixture in &fixtures {
            for has_no_channels in [false, true] {
                assert_eq!(
                    plan(fixture, has_no_channels, DELAY, POPUP),
                    plan(fixture, has_no_channels, DELAY, POPUP),
                    "fixture {fixture:?}"
                );
            }
        }
    }

    #[test]
    fn test_input_type_from_config_names() {
        let parse = |s: &str| serde_json::from_value::<InputType>(serde_json::json!(s)).unwrap();
        assert_eq!(parse("tv"), InputType::Tv);
        assert_eq!(parse("app"), InputType::App);
        assert_eq!(parse("source"), InputType::Source);
        assert_eq!(parse("channel"), InputType::Channel);
        assert_eq!(parse("generic"), InputType::Generic);
        assert_eq!(parse("hdmi"), InputType::Generic);
    }

    #[test]
    fn test_input_type_names_ignore_case() {
        let parse = |s: &str| serde_json::from_value::<InputType>(serde_json::json!(s)).unwrap();
        assert_eq!(parse("TV"), InputType::Tv);
        assert_eq!(parse("App"), InputType::App);
        assert_eq!(parse("SOURCE"), InputType::Source);
        assert_eq!(parse("Channel"), InputType::Channel);

        let input: InputDescriptor =
            serde_json::from_value(serde_json::json!({ "name": "TV", "type": "TV" })).unwrap();
        assert_eq!(input.kind, InputType::Tv);
        assert_eq!(plan(&input, true, DELAY, POPUP).keys(), vec![Key::WatchTV]);
    }
}
