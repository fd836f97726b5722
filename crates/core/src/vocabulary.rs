//! Fixed vocabulary tables for rendering log descriptions

use crate::classify::Operation;
use crate::record::EntryKind;
use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Language of rendered descriptions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Locale {
    /// English
    #[default]
    #[serde(rename = "en")]
    En,
    /// Simplified Chinese
    #[serde(rename = "zh-cn")]
    ZhCn,
}

impl Locale {
    /// Past-tense verb for an operation
    pub fn verb(self, operation: Operation) -> &'static str {
        match (self, operation) {
            (Locale::En, Operation::Create) => "created",
            (Locale::En, Operation::Remove) => "removed",
            (Locale::En, Operation::Modify) => "modified",
            (Locale::En, Operation::Move) => "moved",
            (Locale::En, Operation::Rename) => "renamed",
            (Locale::ZhCn, Operation::Create) => "新增",
            (Locale::ZhCn, Operation::Remove) => "删除",
            (Locale::ZhCn, Operation::Modify) => "修改",
            (Locale::ZhCn, Operation::Move) => "移动",
            (Locale::ZhCn, Operation::Rename) => "重命名",
        }
    }

    /// Noun for an entry kind
    pub fn noun(self, kind: EntryKind) -> &'static str {
        match (self, kind) {
            (Locale::En, EntryKind::File) => "file",
            (Locale::En, EntryKind::Directory) => "directory",
            (Locale::ZhCn, EntryKind::File) => "文件",
            (Locale::ZhCn, EntryKind::Directory) => "文件夹",
        }
    }

    /// Separator placed between verb and noun
    fn word_gap(self) -> &'static str {
        match self {
            Locale::En => " ",
            Locale::ZhCn => "",
        }
    }

    /// 24-hour, seconds-precision timestamp format
    fn time_format(self) -> &'static str {
        match self {
            Locale::En => "%Y-%m-%d %H:%M:%S",
            Locale::ZhCn => "%Y/%-m/%-d %H:%M:%S",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locale::En => f.write_str("en"),
            Locale::ZhCn => f.write_str("zh-cn"),
        }
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "zh-cn" | "zh_cn" | "zh" => Ok(Locale::ZhCn),
            other => Err(format!("unknown locale '{}' (expected en or zh-cn)", other)),
        }
    }
}

/// Time zone used when rendering timestamps
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayZone {
    /// Host local time
    #[default]
    Local,
    /// Coordinated universal time
    Utc,
}

/// Rendering settings for log descriptions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderOptions {
    /// Vocabulary language
    #[serde(default)]
    pub locale: Locale,
    /// Zone for the timestamp prefix
    #[serde(default)]
    pub zone: DisplayZone,
}

impl RenderOptions {
    /// Format a timestamp in this locale and zone
    pub fn format_time(&self, time: DateTime<Utc>) -> String {
        let format = self.locale.time_format();
        match self.zone {
            DisplayZone::Local => time.with_timezone(&Local).format(format).to_string(),
            DisplayZone::Utc => time.format(format).to_string(),
        }
    }

    /// Render the human-readable description of a change
    ///
    /// `"<time> <verb><gap><noun> <path>"`, where path is `"<from> -> <to>"`
    /// when a source path is given.
    pub fn describe(
        &self,
        time: DateTime<Utc>,
        operation: Operation,
        kind: EntryKind,
        from: Option<&str>,
        to: &str,
    ) -> String {
        let mut description = format!(
            "{} {}{}{}",
            self.format_time(time),
            self.locale.verb(operation),
            self.locale.word_gap(),
            self.locale.noun(kind),
        );

        match from {
            Some(from) => {
                description.push(' ');
                description.push_str(from);
                description.push_str(" -> ");
                description.push_str(to);
            }
            None => {
                description.push(' ');
                description.push_str(to);
            }
        }

        description
    }
}
