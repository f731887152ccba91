//! Parsing of the free-form `--extra` argument.
//!
//! Torrent clients usually allow a single templated command line per download,
//! so per-download tweaks are packed into one string of comma-separated
//! `KEY:VALUE` pairs, e.g. `NAME:Frieren,EXCLUDES:SPs;Menus,DIRECT:true`.

use std::collections::HashMap;

const ITEM_DELIMITER: char = ',';
const KEY_VALUE_DELIMITER: char = ':';
const EXCLUDES_DELIMITER: char = ';';

/// Settings recognised in an `--extra` string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtraArguments {
    /// `FILTER`: filter expression forwarded to FileBot.
    pub filter: Option<String>,
    /// `EXCLUDES`: additional directory names to prune.
    pub excludes: Vec<String>,
    /// `NAME`: media name, overriding `--name`.
    pub name: Option<String>,
    /// `DIRECT`: skip staging when `true`.
    pub is_direct: bool,
}

impl ExtraArguments {
    /// Parse an `--extra` string. Malformed items are logged and skipped.
    pub fn parse(extra: &str) -> Self {
        let mut pairs = parse_pairs(extra);

        let filter = pairs.remove("FILTER");
        let name = pairs.remove("NAME");
        let excludes = pairs
            .remove("EXCLUDES")
            .map(|value| {
                value
                    .split(EXCLUDES_DELIMITER)
                    .map(str::trim)
                    .filter(|dir| !dir.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let is_direct = pairs
            .remove("DIRECT")
            .is_some_and(|value| value.eq_ignore_ascii_case("true"));

        for key in pairs.keys() {
            tracing::debug!("Ignoring unknown extra argument key '{}'", key);
        }

        Self {
            filter,
            excludes,
            name,
            is_direct,
        }
    }
}

/// Split `extra` into upper-cased keys and trimmed values. Later keys win.
fn parse_pairs(extra: &str) -> HashMap<String, String> {
    let mut result = HashMap::new();

    for item in extra.split(ITEM_DELIMITER) {
        if item.trim().is_empty() {
            continue;
        }
        let Some((key, value)) = item.split_once(KEY_VALUE_DELIMITER) else {
            tracing::warn!(
                "Ignoring invalid argument: '{}' (missing '{}')",
                item,
                KEY_VALUE_DELIMITER
            );
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            tracing::warn!("Ignoring argument with empty key: '{}'", item);
            continue;
        }
        result.insert(key.to_uppercase(), value.trim().to_string());
    }

    result
}
