//! # Typed Settings
//!
//! Strongly-typed facades over [`Settings`] for the built-in Retype sub-commands.
//! Every method delegates to the generic settings operations, so the facades carry no
//! per-option logic: the macro only maps a method name to an option name.

use crate::{core::settings::Settings, models::OptionValue};
use std::{path::Path, time::Duration};

macro_rules! typed_settings {
    (
        $(#[$meta:meta])*
        $name:ident => $sub:literal {
            $( string $s_opt:literal => $s_get:ident, $s_set:ident, $s_reset:ident; )*
            $( integer $i_opt:literal => $i_get:ident, $i_set:ident, $i_reset:ident; )*
            $( flag $f_opt:literal => $f_get:ident, $f_set:ident, $f_reset:ident,
                $f_enable:ident, $f_disable:ident, $f_toggle:ident; )*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name(Settings);

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<$name> for Settings {
            fn from(typed: $name) -> Self {
                typed.0
            }
        }

        impl AsRef<Settings> for $name {
            fn as_ref(&self) -> &Settings {
                &self.0
            }
        }

        impl $name {
            /// The sub-command these settings compile to.
            pub const SUB_COMMAND: &'static str = $sub;

            /// Creates an empty instance: every option is absent.
            pub fn new() -> Self {
                Self(Settings::new($sub))
            }

            /// The underlying generic settings.
            pub fn settings(&self) -> &Settings {
                &self.0
            }

            /// Applies a generic transformation and keeps the typed wrapper.
            #[must_use]
            pub fn map(&self, change: impl FnOnce(&Settings) -> Settings) -> Self {
                Self(change(&self.0))
            }

            $(
                #[doc = concat!("Current value of `", $s_opt, "`.")]
                pub fn $s_get(&self) -> Option<&str> {
                    self.0.get($s_opt).and_then(OptionValue::as_str)
                }

                #[doc = concat!("Sets `", $s_opt, "`.")]
                #[must_use]
                pub fn $s_set(&self, value: impl Into<String>) -> Self {
                    let value: String = value.into();
                    Self(self.0.set($s_opt, value))
                }

                #[doc = concat!("Clears `", $s_opt, "`.")]
                #[must_use]
                pub fn $s_reset(&self) -> Self {
                    Self(self.0.reset($s_opt))
                }
            )*

            $(
                #[doc = concat!("Current value of `", $i_opt, "`.")]
                pub fn $i_get(&self) -> Option<i64> {
                    self.0.get($i_opt).and_then(OptionValue::as_int)
                }

                #[doc = concat!("Sets `", $i_opt, "`.")]
                #[must_use]
                pub fn $i_set(&self, value: impl Into<i64>) -> Self {
                    let value: i64 = value.into();
                    Self(self.0.set($i_opt, value))
                }

                #[doc = concat!("Clears `", $i_opt, "`.")]
                #[must_use]
                pub fn $i_reset(&self) -> Self {
                    Self(self.0.reset($i_opt))
                }
            )*

            $(
                #[doc = concat!("Current value of `", $f_opt, "`.")]
                pub fn $f_get(&self) -> Option<bool> {
                    self.0.get($f_opt).and_then(OptionValue::as_bool)
                }

                #[doc = concat!("Sets `", $f_opt, "`.")]
                #[must_use]
                pub fn $f_set(&self, value: bool) -> Self {
                    Self(self.0.set($f_opt, value))
                }

                #[doc = concat!("Clears `", $f_opt, "`.")]
                #[must_use]
                pub fn $f_reset(&self) -> Self {
                    Self(self.0.reset($f_opt))
                }

                #[doc = concat!("Enables `", $f_opt, "`.")]
                #[must_use]
                pub fn $f_enable(&self) -> Self {
                    Self(self.0.enable($f_opt))
                }

                #[doc = concat!("Disables `", $f_opt, "`.")]
                #[must_use]
                pub fn $f_disable(&self) -> Self {
                    Self(self.0.disable($f_opt))
                }

                #[doc = concat!("Toggles `", $f_opt, "`; absent counts as disabled.")]
                #[must_use]
                pub fn $f_toggle(&self) -> Self {
                    Self(self.0.toggle($f_opt))
                }
            )*

            /// See [`Settings::with_tool_path`].
            #[must_use]
            pub fn with_tool_path(&self, path: impl AsRef<Path>) -> Self {
                Self(self.0.with_tool_path(path))
            }

            /// See [`Settings::with_working_directory`].
            #[must_use]
            pub fn with_working_directory(&self, dir: impl AsRef<Path>) -> Self {
                Self(self.0.with_working_directory(dir))
            }

            /// See [`Settings::with_env`].
            #[must_use]
            pub fn with_env(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
                Self(self.0.with_env(key, value))
            }

            /// See [`Settings::with_timeout`].
            #[must_use]
            pub fn with_timeout(&self, timeout: Duration) -> Self {
                Self(self.0.with_timeout(timeout))
            }

            /// See [`Settings::with_log_output`].
            #[must_use]
            pub fn with_log_output(&self, enabled: bool) -> Self {
                Self(self.0.with_log_output(enabled))
            }

            /// See [`Settings::with_log_invocation`].
            #[must_use]
            pub fn with_log_invocation(&self, enabled: bool) -> Self {
                Self(self.0.with_log_invocation(enabled))
            }
        }
    };
}

typed_settings! {
    /// Settings for `retype build`.
    BuildSettings => "build" {
        string "output" => output, set_output, reset_output;
        string "secret" => secret, set_secret, reset_secret;
        string "override" => override_config, set_override, reset_override;
        string "config" => config, set_config, reset_config;
        flag "verbose" => verbose, set_verbose, reset_verbose,
            enable_verbose, disable_verbose, toggle_verbose;
    }
}

typed_settings! {
    /// Settings for `retype watch`.
    WatchSettings => "watch" {
        string "secret" => secret, set_secret, reset_secret;
        string "host" => host, set_host, reset_host;
        string "config" => config, set_config, reset_config;
        integer "port" => port, set_port, reset_port;
        flag "api" => watch_api, set_watch_api, reset_watch_api,
            enable_watch_api, disable_watch_api, toggle_watch_api;
        flag "verbose" => verbose, set_verbose, reset_verbose,
            enable_verbose, disable_verbose, toggle_verbose;
    }
}

typed_settings! {
    /// Settings for `retype run`.
    RunSettings => "run" {
        string "host" => host, set_host, reset_host;
        string "config" => config, set_config, reset_config;
        integer "port" => port, set_port, reset_port;
        flag "verbose" => verbose, set_verbose, reset_verbose,
            enable_verbose, disable_verbose, toggle_verbose;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::descriptor;

    #[test]
    fn test_typed_setters_store_generic_values() {
        let settings = BuildSettings::new()
            .set_output("dist")
            .set_config("site")
            .enable_verbose();
        assert_eq!(settings.output(), Some("dist"));
        assert_eq!(settings.config(), Some("site"));
        assert_eq!(settings.verbose(), Some(true));
        assert_eq!(
            settings.settings().get("output"),
            Some(&OptionValue::Str("dist".to_string()))
        );
    }

    #[test]
    fn test_typed_toggle_and_reset() {
        let s = WatchSettings::new().toggle_watch_api();
        assert_eq!(s.watch_api(), Some(true));
        assert_eq!(s.toggle_watch_api().toggle_watch_api().watch_api(), Some(true));
        assert_eq!(s.reset_watch_api().watch_api(), None);
        assert_eq!(s.disable_watch_api().watch_api(), Some(false));
    }

    #[test]
    fn test_typed_integer_option() {
        let s = RunSettings::new().set_port(5005u16).set_host("0.0.0.0");
        assert_eq!(s.port(), Some(5005));
        assert_eq!(s.reset_port().port(), None);
        assert_eq!(s.host(), Some("0.0.0.0"));
    }

    #[test]
    fn test_typed_receiver_unchanged() {
        let base = BuildSettings::new().set_output("dist");
        let _ = base.reset_output().enable_verbose();
        assert_eq!(base.output(), Some("dist"));
        assert_eq!(base.verbose(), None);
    }

    #[test]
    fn test_typed_options_exist_in_builtin_descriptor() {
        let descriptor = descriptor::retype();
        let cases: [(&str, &[&str]); 3] = [
            (BuildSettings::SUB_COMMAND, &["output", "secret", "override", "config", "verbose"]),
            (WatchSettings::SUB_COMMAND, &["secret", "host", "config", "port", "api", "verbose"]),
            (RunSettings::SUB_COMMAND, &["host", "config", "port", "verbose"]),
        ];
        for (sub, options) in cases {
            let spec = descriptor.sub_command(sub).unwrap();
            for option in options {
                assert!(spec.option(option).is_some(), "{} is missing {}", sub, option);
            }
        }
    }

    #[test]
    fn test_map_keeps_wrapper() {
        let s = RunSettings::new().map(|inner| inner.set("verbose", true));
        assert_eq!(s.verbose(), Some(true));
        assert_eq!(Settings::from(s).sub_command(), "run");
    }
}
