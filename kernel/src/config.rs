// SPDX-License-Identifier: MPL-2.0

//! The configuration of the kernel mmap device.
//!
//! The options are read from a kernel command line, which conforms to the
//! Linux kernel command line rules:
//!
//! <https://www.kernel.org/doc/html/v6.4/admin-guide/kernel-parameters.html>
//!
//! The options of this module are written as `kmd.<option>=<value>`:
//!  * `kmd.name`: the name of the device and of its node under `/dev`;
//!  * `kmd.class`: the name of the device class;
//!  * `kmd.minor`: the minor number of the device;
//!  * `kmd.log_level`: the maximum level of log records (`off`, `error`,
//!    `warn`, `info`, `debug` or `trace`).

use alloc::format;

use log::LevelFilter;

use crate::prelude::*;

/// The configuration of the kernel mmap device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KmdConfig {
    pub device_name: String,
    pub class_name: String,
    pub base_minor: MinorId,
    pub log_level: LevelFilter,
}

impl KmdConfig {
    /// The module name that prefixes the options of this module.
    pub const MODULE_NAME: &'static str = "kmd";

    /// Parses the options of this module from a kernel command line.
    ///
    /// Options of other modules and plain kernel options are ignored, and so
    /// is everything after `--`. An unknown option of this module is skipped
    /// with a warning. A malformed value fails with `EINVAL`.
    pub fn from_cmdline(cmdline: &str) -> Result<Self> {
        let mut config = Self::default();

        for arg in split_arg(cmdline) {
            if arg.is_empty() {
                continue;
            }
            if arg == "--" {
                break;
            }

            // Arg => Entry | Entry "=" Value
            let (entry, value) = match arg.split_once('=') {
                Some((entry, value)) => (entry, Some(unquote(value))),
                None => (arg, None),
            };
            // Entry => Module "." ModuleOptionName | KernelOptionName
            let Some((module, option)) = entry.split_once('.') else {
                continue;
            };
            if module != Self::MODULE_NAME {
                continue;
            }

            match (option, value) {
                ("name", Some(value)) => config.device_name = parse_name(value)?,
                ("class", Some(value)) => config.class_name = parse_name(value)?,
                ("minor", Some(value)) => {
                    let minor = value.parse::<u32>()?;
                    config.base_minor = MinorId::try_new(minor).ok_or(Error::with_message(
                        Errno::EINVAL,
                        "the minor number is too large",
                    ))?;
                }
                ("log_level", Some(value)) => config.log_level = value.parse()?,
                ("name" | "class" | "minor" | "log_level", None) => {
                    return_errno_with_message!(Errno::EINVAL, "the module option has no value");
                }
                _ => warn!("kmd: unknown option {}, skip it", arg),
            }
        }

        Ok(config)
    }

    /// Returns the path of the device node.
    pub fn node_path(&self) -> String {
        format!("/dev/{}", self.device_name)
    }
}

impl Default for KmdConfig {
    fn default() -> Self {
        Self {
            device_name: "kernel-mmap-device".to_string(),
            class_name: "kernel-mmap-device".to_string(),
            base_minor: MinorId::new(0),
            log_level: LevelFilter::Warn,
        }
    }
}

// Splits the command line string by spaces but preserve
// ones that are protected by double quotes(`"`).
fn split_arg(input: &str) -> impl Iterator<Item = &str> {
    let mut inside_quotes = false;

    input.split(move |c: char| {
        if c == '"' {
            inside_quotes = !inside_quotes;
        }

        !inside_quotes && c.is_whitespace()
    })
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|value| value.strip_suffix('"'))
        .unwrap_or(value)
}

fn parse_name(value: &str) -> Result<String> {
    if value.is_empty() || value.contains('/') {
        return_errno_with_message!(Errno::EINVAL, "invalid name");
    }
    Ok(value.to_string())
}
