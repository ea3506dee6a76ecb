use once_cell::sync::Lazy;
use regex::Regex;

use super::{AnalysisSummary, SummarySource};

static FREQUENCY: Lazy<Regex> =
    Lazy::new(|| Regex::new("(자주|자꾸|반복|최근|요즘|종종|가끔)").expect("valid regex"));
static MEMORY: Lazy<Regex> = Lazy::new(|| {
    Regex::new("(깜빡|잊|기억|헷갈|불편|곤란|생각이 안)").expect("valid regex")
});
static TIME_PLACE: Lazy<Regex> =
    Lazy::new(|| Regex::new("(언제|어디|시간|장소|이유|목적)").expect("valid regex"));

const SUMMARY_MAX_CHARS: usize = 120;
const SUMMARY_MIN_CHARS: usize = 80;

/// Keyword heuristics used when the analysis service is unreachable
pub struct LocalSummarizer;

impl LocalSummarizer {
    pub fn summarize(answer: &str) -> AnalysisSummary {
        let answer = answer.trim();

        let frequent = FREQUENCY.is_match(answer);
        let memory = MEMORY.is_match(answer);
        let time_place = TIME_PLACE.is_match(answer);

        let analysis = if memory && frequent {
            "최근 반복되는 건망증 신호가 관찰됩니다"
        } else if memory {
            "일시적 건망증 가능성이 있습니다"
        } else if time_place {
            "상황 설명 위주로 발화가 이루어졌습니다"
        } else if !answer.is_empty() {
            "일상 경험 공유 중심의 발화로 보입니다"
        } else {
            "유의미한 발화가 인식되지 않았습니다"
        };

        let guidance = if frequent {
            "경험이 반복되면 가까운 병원/보건소에서 상담을 받아보시는 것을 권장합니다."
        } else {
            "충분한 수면, 규칙적인 생활, 메모 습관 등이 도움이 됩니다."
        };

        AnalysisSummary {
            summary: Self::condense(answer),
            analysis: analysis.to_string(),
            guidance: guidance.to_string(),
            source: SummarySource::LocalFallback,
        }
    }

    /// First sentence, topped up to the length limit when it is very short
    fn condense(answer: &str) -> String {
        let first_sentence = answer
            .split(['.', '!', '?', '\n'])
            .map(str::trim)
            .find(|s| !s.is_empty());

        let mut summary = match first_sentence {
            Some(sentence) => sentence.to_string(),
            None => answer.chars().take(SUMMARY_MAX_CHARS).collect(),
        };

        let summary_chars = summary.chars().count();
        let answer_chars = answer.chars().count();
        if summary_chars < answer_chars && summary_chars < SUMMARY_MIN_CHARS {
            let extra: String = answer.chars().skip(summary_chars).collect();
            let extra = extra.trim();
            if !extra.is_empty() {
                summary = format!("{} {}", summary, extra)
                    .chars()
                    .take(SUMMARY_MAX_CHARS)
                    .collect();
            }
        }

        summary
    }
}
