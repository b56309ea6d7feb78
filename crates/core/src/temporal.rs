//! Temporal context enhancement.
//!
//! Rewrites relative time phrases ("today", "明天", "this week", ...) into
//! absolute calendar dates before text reaches the model or the search
//! provider. "Now" is resolved from the UTC clock shifted by a fixed offset,
//! never from the host's local time zone, and is recomputed on every call.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Offset, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default offset: UTC+8.
pub const DEFAULT_UTC_OFFSET_HOURS: i32 = 8;

/// Output language for rendered dates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    En,
    #[default]
    Zh,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Zh => "zh",
        }
    }

    fn weekday_names(&self) -> &'static [&'static str; 7] {
        match self {
            Self::En => &[
                "Monday", "Tuesday", "Wednesday", "Thursday", "Friday", "Saturday", "Sunday",
            ],
            Self::Zh => &[
                "星期一", "星期二", "星期三", "星期四", "星期五", "星期六", "星期日",
            ],
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Self::En),
            "zh" => Ok(Self::Zh),
            other => Err(format!("unsupported language '{other}' (expected 'en' or 'zh')")),
        }
    }
}

/// The current date as seen from the enhancer's offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TemporalAnchor {
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub weekday: Weekday,
}

impl TemporalAnchor {
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
            day: date.day(),
            weekday: date.weekday(),
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, self.day)
    }

    /// The previous calendar day, rolling over months and years.
    pub fn yesterday(&self) -> Self {
        self.shift(NaiveDate::pred_opt)
    }

    /// The next calendar day, rolling over months and years.
    pub fn tomorrow(&self) -> Self {
        self.shift(NaiveDate::succ_opt)
    }

    fn shift(&self, step: fn(&NaiveDate) -> Option<NaiveDate>) -> Self {
        // Out of chrono's range only at the ends of time; stay put there.
        self.date()
            .and_then(|d| step(&d))
            .map(Self::from_date)
            .unwrap_or(*self)
    }

    /// `YYYY-MM-DD`
    pub fn ymd(&self) -> String {
        format!("{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }

    /// `YYYY-MM-DD <weekday>` in the given language.
    pub fn format(&self, language: Language) -> String {
        let weekday = language.weekday_names()[self.weekday.num_days_from_monday() as usize];
        format!("{} {}", self.ymd(), weekday)
    }
}

/// A relative time phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Relative {
    Today,
    Recent,
    ThisWeek,
    ThisMonth,
    Yesterday,
    Tomorrow,
}

/// Recognized keywords. Longer entries come first so that at any position
/// the longest keyword wins ("recently" before "recent").
const KEYWORDS: &[(&str, Relative)] = &[
    ("this month", Relative::ThisMonth),
    ("yesterday", Relative::Yesterday),
    ("this week", Relative::ThisWeek),
    ("tomorrow", Relative::Tomorrow),
    ("recently", Relative::Recent),
    ("recent", Relative::Recent),
    ("today", Relative::Today),
    ("now", Relative::Today),
    ("今天", Relative::Today),
    ("现在", Relative::Today),
    ("最近", Relative::Recent),
    ("本周", Relative::ThisWeek),
    ("本月", Relative::ThisMonth),
    ("昨天", Relative::Yesterday),
    ("明天", Relative::Tomorrow),
];

fn render(relative: Relative, anchor: &TemporalAnchor, language: Language) -> String {
    let today = anchor.format(language);
    match (relative, language) {
        (Relative::Today, _) => today,
        (Relative::Yesterday, _) => anchor.yesterday().format(language),
        (Relative::Tomorrow, _) => anchor.tomorrow().format(language),
        (Relative::Recent, Language::Zh) => format!("{today} 附近"),
        (Relative::ThisWeek, Language::Zh) => format!("{today} 本周"),
        (Relative::ThisMonth, Language::Zh) => format!("{today} 本月"),
        (Relative::Recent, Language::En) => format!("around {today}"),
        (Relative::ThisWeek, Language::En) => format!("the week of {today}"),
        (Relative::ThisMonth, Language::En) => format!("the month of {today}"),
    }
}

/// Try to match a keyword at byte offset `at`. Returns the keyword length.
///
/// ASCII keywords match case-insensitively and only on word boundaries, so
/// "now" inside "know" is left alone. CJK keywords match anywhere.
fn match_keyword(text: &str, at: usize) -> Option<(usize, Relative)> {
    let rest = &text[at..];
    KEYWORDS.iter().find_map(|(keyword, relative)| {
        let len = keyword.len();
        if !keyword.is_ascii() {
            return rest.starts_with(keyword).then_some((len, *relative));
        }
        let candidate = rest.get(..len)?;
        if !candidate.eq_ignore_ascii_case(keyword) {
            return None;
        }
        let before_ok = text[..at]
            .chars()
            .next_back()
            .is_none_or(|c| !c.is_alphanumeric());
        let after_ok = rest[len..]
            .chars()
            .next()
            .is_none_or(|c| !c.is_alphanumeric());
        (before_ok && after_ok).then_some((len, *relative))
    })
}

/// Rewrites relative time phrases into absolute dates.
#[derive(Debug, Clone, Copy)]
pub struct TemporalEnhancer {
    offset: FixedOffset,
    language: Language,
}

impl Default for TemporalEnhancer {
    fn default() -> Self {
        Self::new(DEFAULT_UTC_OFFSET_HOURS, Language::Zh)
    }
}

impl TemporalEnhancer {
    /// Create an enhancer for a whole-hour UTC offset.
    ///
    /// Offsets chrono cannot represent fall back to UTC; configuration
    /// validation keeps them within [-12, 14].
    pub fn new(utc_offset_hours: i32, language: Language) -> Self {
        let offset = FixedOffset::east_opt(utc_offset_hours * 3600).unwrap_or(Utc.fix());
        Self { offset, language }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Resolve "now" from the system clock.
    pub fn anchor(&self) -> TemporalAnchor {
        self.anchor_at(Utc::now())
    }

    /// Resolve the anchor for a given instant.
    pub fn anchor_at(&self, now: DateTime<Utc>) -> TemporalAnchor {
        TemporalAnchor::from_date(now.with_timezone(&self.offset).date_naive())
    }

    /// Today's date rendered as `YYYY-MM-DD <weekday>`.
    pub fn today(&self) -> String {
        self.anchor().format(self.language)
    }

    /// Rewrite `text` using the current clock.
    pub fn enhance(&self, text: &str) -> String {
        self.enhance_at(text, Utc::now())
    }

    /// Rewrite `text` as of `now`.
    ///
    /// All keywords are replaced in one left-to-right pass over the original
    /// text, so a replacement is never itself rescanned. Text with no
    /// keyword is returned unchanged.
    pub fn enhance_at(&self, text: &str, now: DateTime<Utc>) -> String {
        let anchor = self.anchor_at(now);
        let mut out = String::with_capacity(text.len());
        let mut at = 0;

        while at < text.len() {
            if let Some((len, relative)) = match_keyword(text, at) {
                out.push_str(&render(relative, &anchor, self.language));
                at += len;
                continue;
            }
            // `at` always sits on a char boundary here.
            let Some(c) = text[at..].chars().next() else { break };
            out.push(c);
            at += c.len_utf8();
        }

        out
    }
}
