//! Extraction prompt contract.
//!
//! Extractor implementations send this prompt as the system message and the
//! document text as the user message. The parser relies on the format it
//! asks for: one `<tag>LABEL</tag>SUMMARY` per line, or the bare sentinel.

use sha2::{Digest, Sha256};

use crate::types::taxonomy::Taxonomy;

/// English extraction prompt.
pub const EXTRACT_PROMPT_EN: &str = r#"As an information extraction assistant, read the news article or web page provided by the user and extract the information related to the following focus points:

{focus_list}

Definitions of the focus points:
{focus_statement}

Output one line per piece of information, in this format:
<tag>focus point name</tag>summary of the information

Rules:
- The focus point name must be copied exactly from the list above.
- Each summary must state who, what, when and where, using only facts written in the text. Do not add numbers, dates, names or titles that the text does not contain.
- Merge information about the same event into one line.
- If the text contains no information related to any focus point, output only: {sentinel}"#;

/// Chinese extraction prompt.
pub const EXTRACT_PROMPT_ZH: &str = r#"作为信息提取助手，请阅读用户提供的新闻或网页文本，提取与以下关注点相关的信息：

{focus_list}

各关注点的说明如下：
{focus_statement}

每条信息输出一行，格式如下：
<tag>关注点名称</tag>信息摘要

要求：
- 关注点名称必须与上面列表中的完全一致。
- 摘要须包含时间、地点、人物和事件等要素，且只能使用原文中出现的事实，不得添加原文没有的数字、日期、人名或标题。
- 同一事件的信息合并为一行。
- 如果文本中没有任何与关注点相关的信息，仅输出：{sentinel}"#;

/// Prompt language, chosen from the taxonomy text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    En,
    Zh,
}

impl Language {
    /// Chinese when fewer than 68% of the characters are non-Chinese.
    pub fn detect(text: &str) -> Self {
        let total = text.chars().count();
        if total == 0 {
            return Self::En;
        }
        let non_chinese = text
            .chars()
            .filter(|c| !('\u{4e00}'..='\u{9fa5}').contains(c))
            .count();
        if (non_chinese as f64 / total as f64) < 0.68 {
            Self::Zh
        } else {
            Self::En
        }
    }

    pub fn for_taxonomy(taxonomy: &Taxonomy) -> Self {
        let text: String = taxonomy
            .points()
            .map(|p| format!("{}{}", p.name, p.explanation))
            .collect();
        Self::detect(&text)
    }

    fn template(self) -> &'static str {
        match self {
            Self::En => EXTRACT_PROMPT_EN,
            Self::Zh => EXTRACT_PROMPT_ZH,
        }
    }
}

/// Format the extraction prompt for a taxonomy.
pub fn format_extract_prompt(taxonomy: &Taxonomy, sentinel: &str) -> String {
    Language::for_taxonomy(taxonomy)
        .template()
        .replace("{focus_list}", &taxonomy.focus_list())
        .replace("{focus_statement}", &taxonomy.focus_statement())
        .replace("{sentinel}", sentinel)
}

/// Get the hash of the formatted extraction prompt.
pub fn extract_prompt_hash(taxonomy: &Taxonomy, sentinel: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format_extract_prompt(taxonomy, sentinel).as_bytes());
    format!("{:x}", hasher.finalize())
}
