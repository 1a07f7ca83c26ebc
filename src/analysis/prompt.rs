//! Rubric text and prompt assembly for the scoring request.

/// Separator line placed between article summaries in the user prompt.
pub const SUMMARY_SEPARATOR: &str = "\n---\n";

/// Fixed system instruction: five weighted categories, integer scores,
/// total out of 50, and the required JSON output schema. Kept in Korean
/// to match the article text the feeds deliver.
pub const SYSTEM_INSTRUCTION: &str = "\
당신은 뉴스 기사의 공공 영향도를 평가하는 분석가입니다. \
아래 기사 목록을 읽고 다섯 개 항목에 정수 점수를 매기세요.\n\
- 안전성 (0~15점)\n\
- 경제성 (0~10점)\n\
- 환경성 (0~10점)\n\
- 사회적 파급력 (0~10점)\n\
- 정책 연관성 (0~5점)\n\
총점은 50점 만점입니다. 반드시 아래 스키마의 JSON만 출력하세요.\n\
{\"total_score\": <정수>, \"category_scores\": {\"안전성\": <정수>, \
\"경제성\": <정수>, \"환경성\": <정수>, \"사회적 파급력\": <정수>, \
\"정책 연관성\": <정수>}, \"summary\": \"<한두 문장 요약>\"}";

/// Joins the collected article summaries into the user prompt.
pub fn build_prompt(summaries: &[String]) -> String {
    summaries.join(SUMMARY_SEPARATOR)
}
