//! 文本分句器
//!
//! 将文章正文切分为可独立合成的句子单元，并标记标题样式的句子

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// 标题判定的最大长度（冒号结尾的短句）
pub const HEADING_COLON_MAX_CHARS: usize = 50;

/// 不在其后分句的常见缩写（小写，不含末尾句点）
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "st", "sr", "jr", "prof", "rev", "gen", "col", "lt", "sgt", "capt",
    "vs", "etc", "e.g", "i.e", "approx", "inc", "ltd", "corp", "dept", "jan", "feb", "apr", "jun",
    "jul", "aug", "sep", "sept", "oct", "nov",
];

/// 仅在数字前不分句的缩写: "No. 5", "Vol. 2", "Fig. 3"
const NUMBER_ABBREVIATIONS: &[&str] = &["no", "vol", "fig", "pp"];

/// 编号标题: "1. Introduction", "12.Overview"
static NUMBERED_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d+\.\s*[\p{L}\p{N}][^.!?]{0,48}$").expect("valid regex"));

/// 段落分隔（空行）
static PARAGRAPH_BREAK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n[ \t\r\f\v]*\n").expect("valid regex"));

/// 分句配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SegmentConfig {
    /// 空行分隔的段落边界也作为句子边界
    #[serde(default)]
    pub paragraph_breaks: bool,
}

/// 句子单元
///
/// 不变量:
/// - text 非空且已去除首尾空白
/// - index 为文档顺序中的位置，会话内稳定
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentenceUnit {
    pub text: String,
    pub index: usize,
    pub is_heading: bool,
}

impl SentenceUnit {
    fn new(index: usize, text: String) -> Self {
        let is_heading = is_heading(&text);
        Self {
            text,
            index,
            is_heading,
        }
    }
}

/// 句末标点之后允许出现的闭合字符
#[inline]
fn is_closing(ch: char) -> bool {
    matches!(
        ch,
        '"' | '\'' | ')' | ']' | '}' | '\u{201D}' | '\u{2019}' | '\u{00BB}'
    )
}

/// 检查片段是否只包含引号或括号（应合并到前一个句子）
#[inline]
fn is_trivial_segment(s: &str) -> bool {
    s.chars().all(|c| {
        is_closing(c) || matches!(c, '(' | '[' | '{' | '\u{201C}' | '\u{2018}' | '\u{00AB}' | ' ')
    })
}

/// 判断一个词是否以句末标点结束
///
/// `position` 为该词在当前句子中的位置（从 0 开始），用于识别行首编号；
/// `next` 为下一个词
fn ends_sentence(word: &str, position: usize, next: &str) -> bool {
    let stem = word.trim_end_matches(is_closing);
    if stem.ends_with('!') || stem.ends_with('?') {
        return true;
    }
    if !stem.ends_with('.') {
        return false;
    }
    // 省略号
    if stem.ends_with("...") || stem.ends_with('\u{2026}') {
        return true;
    }

    let body = stem
        .trim_end_matches('.')
        .trim_start_matches(|c: char| !c.is_alphanumeric());
    if body.is_empty() {
        return false;
    }

    // 单字母缩写: "J. K. Rowling"
    let mut chars = body.chars();
    if let (Some(first), None) = (chars.next(), chars.next()) {
        if first.is_alphabetic() {
            return false;
        }
    }

    let lower = body.to_lowercase();
    if ABBREVIATIONS.contains(&lower.as_str()) || body.contains('.') {
        return false;
    }
    if NUMBER_ABBREVIATIONS.contains(&lower.as_str())
        && next.starts_with(|c: char| c.is_ascii_digit())
    {
        return false;
    }

    // 句首编号: "1. Introduction"
    if position == 0 && body.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }

    true
}

/// 判断下一个词能否开启新句子
///
/// 保守策略：只有首个字母数字字符为大写或数字时才分句
fn starts_sentence(word: &str) -> bool {
    word.chars()
        .find(|c| c.is_alphanumeric())
        .map(|c| c.is_uppercase() || c.is_numeric() || !has_case(c))
        .unwrap_or(false)
}

/// 无大小写区分的文字（如汉字）
#[inline]
fn has_case(c: char) -> bool {
    c.is_lowercase() || c.is_uppercase()
}

/// 对单个段落分句（段落内部空白已规范化为单个空格）
fn split_paragraph(normalized: &str) -> Vec<String> {
    let words: Vec<&str> = normalized.split(' ').filter(|w| !w.is_empty()).collect();
    let mut sentences = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for (i, word) in words.iter().enumerate() {
        let position = current.len();
        current.push(word);

        let split = match words.get(i + 1) {
            Some(next) => ends_sentence(word, position, next) && starts_sentence(next),
            None => false,
        };

        if split {
            sentences.push(current.join(" "));
            current.clear();
        }
    }

    if !current.is_empty() {
        sentences.push(current.join(" "));
    }

    sentences
}

/// 将空白序列规范化为单个空格
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 对文本进行分句
///
/// 分句策略：
/// 1. 规范化空白（可选：先按空行切分段落）
/// 2. 在句末标点 + 空白 + 大写字母处分句，跳过常见缩写
/// 3. 只有引号的片段合并到前一个句子
/// 4. 按文档顺序分配从 0 开始的连续索引
pub fn segment(raw_text: &str, config: &SegmentConfig) -> Vec<SentenceUnit> {
    let paragraphs: Vec<&str> = if config.paragraph_breaks {
        PARAGRAPH_BREAK.split(raw_text).collect()
    } else {
        vec![raw_text]
    };

    let mut texts: Vec<String> = Vec::new();
    for paragraph in paragraphs {
        let normalized = normalize_whitespace(paragraph);
        if normalized.is_empty() {
            continue;
        }

        for sentence in split_paragraph(&normalized) {
            if is_trivial_segment(&sentence) {
                if let Some(last) = texts.last_mut() {
                    last.push(' ');
                    last.push_str(&sentence);
                    continue;
                }
            }
            texts.push(sentence);
        }
    }

    texts
        .into_iter()
        .enumerate()
        .map(|(index, text)| SentenceUnit::new(index, text))
        .collect()
}

/// 使用默认配置分句
pub fn segment_default(raw_text: &str) -> Vec<SentenceUnit> {
    segment(raw_text, &SegmentConfig::default())
}

/// 标题启发式判断
///
/// 满足任一条件即为标题（仅用于渲染强调，不影响播放顺序）：
/// - 不含小写字母的全大写/数字/标点文本
/// - 不超过 50 个字符且以冒号结尾
/// - 编号标题（数字 + 句点 + 短语）
pub fn is_heading(text: &str) -> bool {
    let text = text.trim();
    if text.is_empty() {
        return false;
    }

    // 字母全部大写（无大小写的文字不算），数字与标点不限
    let has_alnum = text.chars().any(char::is_alphanumeric);
    if has_alnum && text.chars().filter(|c| c.is_alphabetic()).all(char::is_uppercase) {
        return true;
    }

    if text.chars().count() <= HEADING_COLON_MAX_CHARS && text.ends_with(':') {
        return true;
    }

    NUMBERED_HEADING.is_match(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(units: &[SentenceUnit]) -> Vec<&str> {
        units.iter().map(|u| u.text.as_str()).collect()
    }

    #[test]
    fn test_empty_input() {
        assert!(segment_default("").is_empty());
        assert!(segment_default("   ").is_empty());
        assert!(segment_default("\n\t \n").is_empty());
    }

    #[test]
    fn test_basic_split() {
        let units = segment_default("Hello there.  How are you?\nI am fine!");
        assert_eq!(texts(&units), vec!["Hello there.", "How are you?", "I am fine!"]);
        let indices: Vec<usize> = units.iter().map(|u| u.index).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn test_no_terminal_punctuation_single_unit() {
        let text = "a long run of words without any terminal punctuation at all";
        let units = segment_default(text);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].text, text);
    }

    #[test]
    fn test_no_split_before_lowercase() {
        let units = segment_default("The value was approx. twelve units. Next sentence.");
        assert_eq!(units.len(), 2);
        assert_eq!(units[0].text, "The value was approx. twelve units.");
    }

    #[test]
    fn test_abbreviations_and_initials() {
        let units = segment_default("Mr. Smith met Dr. Jones. J. K. Rowling wrote it. Done.");
        assert_eq!(
            texts(&units),
            vec!["Mr. Smith met Dr. Jones.", "J. K. Rowling wrote it.", "Done."]
        );
    }

    #[test]
    fn test_sentence_final_words_still_split() {
        let units = segment_default("The answer is no. We left early. It was in Co. Then more.");
        assert_eq!(
            texts(&units),
            vec!["The answer is no.", "We left early.", "It was in Co.", "Then more."]
        );

        // 数字前的编号缩写不分句
        let units = segment_default("See No. 5 and Fig. 2 for details. Done.");
        assert_eq!(texts(&units), vec!["See No. 5 and Fig. 2 for details.", "Done."]);
    }

    #[test]
    fn test_closing_quote_stays_with_sentence() {
        let units = segment_default("He said \"Stop.\" Then he left.");
        assert_eq!(texts(&units), vec!["He said \"Stop.\"", "Then he left."]);
    }

    #[test]
    fn test_numbered_heading_not_split() {
        let units = segment_default("1. Introduction This part explains things.");
        assert_eq!(units.len(), 1);

        let units = segment(
            "1. Introduction\n\nThis part explains things.",
            &SegmentConfig {
                paragraph_breaks: true,
            },
        );
        assert_eq!(texts(&units), vec!["1. Introduction", "This part explains things."]);
        assert!(units[0].is_heading);
        assert!(!units[1].is_heading);
    }

    #[test]
    fn test_year_at_sentence_end_splits() {
        let units = segment_default("I was born in 1990. Then we moved.");
        assert_eq!(units.len(), 2);
    }

    #[test]
    fn test_join_reproduces_normalized_text() {
        let samples = [
            "One. Two!  Three?\n\nFour five six",
            "  Leading space. And \t tabs.\r\nAnd more ",
            "Mr. X said: \"Go!\" (Really.) Fine.",
            "CHAPTER ONE\n\nIt was a dark night. The END",
        ];
        for sample in samples {
            for paragraph_breaks in [false, true] {
                let config = SegmentConfig { paragraph_breaks };
                let units = segment(sample, &config);
                let joined = texts(&units).join(" ");
                assert_eq!(joined, normalize_whitespace(sample), "sample: {sample:?}");
                for (i, unit) in units.iter().enumerate() {
                    assert_eq!(unit.index, i);
                    assert!(!unit.text.is_empty());
                    assert_eq!(unit.text, unit.text.trim());
                }
            }
        }
    }

    #[test]
    fn test_quote_only_paragraph_merged() {
        let config = SegmentConfig {
            paragraph_breaks: true,
        };
        let units = segment("This is a longer sentence.\n\n\"\n\nAnother sentence here.", &config);
        assert_eq!(units.len(), 2);
        assert!(units[0].text.ends_with('"'));
    }

    #[test]
    fn test_is_heading() {
        assert!(is_heading("CHAPTER ONE"));
        assert!(!is_heading("This is a normal sentence."));
        assert!(is_heading("Notes:"));
        assert!(is_heading("1. Introduction"));
        assert!(is_heading("PART 2 - THE RETURN"));
        assert!(!is_heading("1. The cat sat on the mat."));
        assert!(!is_heading("..."));
        assert!(is_heading("2024"));
        assert!(is_heading("1914 - 1918"));
        assert!(!is_heading("\u{4F60}\u{597D}\u{3002}"));
        assert!(!is_heading(
            "This sentence is far too long to be considered a heading at all:"
        ));
    }

    #[test]
    fn test_heading_flag_on_units() {
        let units = segment(
            "CHAPTER ONE\n\nIt was a dark night.",
            &SegmentConfig {
                paragraph_breaks: true,
            },
        );
        assert_eq!(units.len(), 2);
        assert!(units[0].is_heading);
        assert!(!units[1].is_heading);
    }
}
