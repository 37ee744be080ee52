//! Script-based language detection.
//!
//! Counts characters per script and picks the first script whose share of the
//! trimmed text exceeds 30%, checked in the order Japanese kana, Hangul, CJK
//! ideographs, Latin letters. Kana is checked before ideographs because
//! Japanese text mixes both.

/// Language used when the text gives no clear signal.
pub const DEFAULT_LANGUAGE: &str = "zh";

const SCRIPT_THRESHOLD: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Script {
    Han,
    Kana,
    Hangul,
    Latin,
}

fn script_of(c: char) -> Option<Script> {
    match c {
        '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' | '\u{F900}'..='\u{FAFF}' => {
            Some(Script::Han)
        }
        '\u{3040}'..='\u{30FF}' => Some(Script::Kana),
        '\u{AC00}'..='\u{D7AF}' => Some(Script::Hangul),
        'A'..='Z' | 'a'..='z' => Some(Script::Latin),
        _ => None,
    }
}

#[derive(Debug, Default)]
struct ScriptCounts {
    han: usize,
    kana: usize,
    hangul: usize,
    latin: usize,
    total: usize,
}

impl ScriptCounts {
    fn of(text: &str) -> Self {
        let mut counts = Self::default();
        for c in text.chars() {
            counts.total += 1;
            match script_of(c) {
                Some(Script::Han) => counts.han += 1,
                Some(Script::Kana) => counts.kana += 1,
                Some(Script::Hangul) => counts.hangul += 1,
                Some(Script::Latin) => counts.latin += 1,
                None => {}
            }
        }
        counts
    }

    fn dominant(&self, count: usize) -> bool {
        self.total > 0 && count as f64 / self.total as f64 > SCRIPT_THRESHOLD
    }
}

/// Detect the language of `text`, returning `default` when no script dominates.
///
/// ```
/// use flow_tts::language::detect_language;
///
/// assert_eq!(detect_language("你好世界", "zh"), "zh");
/// assert_eq!(detect_language("Hello world", "zh"), "en");
/// assert_eq!(detect_language("123456", "zh"), "zh");
/// ```
pub fn detect_language(text: &str, default: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return default.to_string();
    }

    let counts = ScriptCounts::of(trimmed);
    let detected = if counts.dominant(counts.kana) {
        "ja"
    } else if counts.dominant(counts.hangul) {
        "ko"
    } else if counts.dominant(counts.han) {
        "zh"
    } else if counts.dominant(counts.latin) {
        "en"
    } else {
        default
    };
    detected.to_string()
}

/// Detect the language of each text in order.
pub fn detect_languages<S: AsRef<str>>(texts: &[S], default: &str) -> Vec<String> {
    texts
        .iter()
        .map(|text| detect_language(text.as_ref(), default))
        .collect()
}

/// True if any character is a CJK ideograph, kana or Hangul syllable.
pub fn contains_cjk(text: &str) -> bool {
    text.chars()
        .any(|c| matches!(script_of(c), Some(Script::Han | Script::Kana | Script::Hangul)))
}
