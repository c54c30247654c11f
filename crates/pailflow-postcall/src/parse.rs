use pailflow_core::types::QaPair;

/// Tokenizes a transcript into Q/A pairs by speaker alternation (spec.md
/// §4.4 step 2), grounded on `process_transcript.py`'s `Interviewer:` /
/// `Candidate:` split, generalized to transcript lines of the shape
/// `"[timestamp] Speaker: content"` produced by the transcript handler.
///
/// Lines spoken by `bot_speaker_name` open a new question; every
/// subsequent non-bot line is appended to the answer until the next bot
/// line. A transcript with no discernible alternation collapses to a
/// single fallback pair per P5.
pub fn parse_transcript(transcript: &str, bot_speaker_name: &str) -> Vec<QaPair> {
    let mut pairs = Vec::new();
    let mut current_question: Option<String> = None;
    let mut current_answer: Vec<String> = Vec::new();

    for line in transcript.lines() {
        let Some((speaker, content)) = split_speaker_line(line) else {
            continue;
        };

        if speaker == bot_speaker_name {
            flush(&mut pairs, &mut current_question, &mut current_answer);
            current_question = Some(content.to_string());
        } else if current_question.is_some() {
            current_answer.push(content.to_string());
        }
    }
    flush(&mut pairs, &mut current_question, &mut current_answer);

    if pairs.is_empty() && !transcript.trim().is_empty() {
        return vec![QaPair {
            question: "Full Interview Transcript".to_string(),
            answer: transcript.to_string(),
            question_id: None,
        }];
    }
    pairs
}

fn flush(
    pairs: &mut Vec<QaPair>,
    question: &mut Option<String>,
    answer: &mut Vec<String>,
) {
    if let Some(q) = question.take() {
        if !answer.is_empty() {
            pairs.push(QaPair {
                question: q,
                answer: answer.join(" "),
                question_id: None,
            });
        }
    }
    answer.clear();
}

/// Strips a leading `"[timestamp] "` marker and splits on the first
/// `"Speaker: "` colon, returning `None` for lines that don't match the
/// transcript handler's line format.
fn split_speaker_line(line: &str) -> Option<(&str, &str)> {
    let after_bracket = if let Some(rest) = line.strip_prefix('[') {
        let (_, rest) = rest.split_once("] ")?;
        rest
    } else {
        line
    };
    let (speaker, content) = after_bracket.split_once(": ")?;
    Some((speaker.trim(), content.trim()))
}
