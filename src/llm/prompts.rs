use crate::models::{BillPool, Speech};

use super::oracle::OracleRequest;

/// System prompt for trigger classification (output contract and rules)
pub const SYSTEM_PROMPT: &str = r#"You are an expert analyst of Korean National Assembly committee transcripts.
You will see speeches made by the subcommittee chair. For each speech decide whether it is a
TRIGGER speech, i.e. one that opens review of a new set of agenda items in this meeting, and
which agenda item numbers (의사일정 제N항) it starts reviewing.

OUTPUT CONTRACT
Output ONLY a JSON array, one object per chair speech listed:
[
  {"order": <integer>, "trigger": <true or false>, "agenda_items": [<integers>]},
  ...
]
- "order" is the number shown in brackets before the speech. Copy it exactly.
- Non-trigger speeches: "trigger": false, "agenda_items": [].
- At least one speech in the list should be a trigger.

RULES
1. Only speeches that declare review, request a report or explanation, or resume review are
   triggers ("심사하도록 하겠습니다", "심사하겠습니다", "일괄하여 심사", "함께 심사", "재심사",
   "설명해 주시기 바랍니다", "보고해 주시기 바랍니다", ...). When a speech names 의사일정 items
   and asks the (senior) expert adviser (전문위원/수석전문위원) to explain or report, it is
   always a trigger for those items.
2. Items that are only tabled ("일괄하여 상정합니다") or only deferred to a later subcommittee
   session ("소위원회에서 계속 심사하도록 하겠습니다") are not reviewed now; leave them out unless
   the same speech goes on to review them or asks for an explanation of them.
3. Use only item numbers that appear in THIS speech. Never carry numbers over from earlier
   speeches. Expand ranges and lists:
     "제4항부터 제7항까지" -> [4, 5, 6, 7]
     "제8항, 제9항, 제11항" -> [8, 9, 11]
     "제1․2․3항" -> [1, 2, 3]
   Numbers mentioned only in votes or declarations of passage ("가결되었음을 선포합니다",
   "이의 없으십니까") are not reviewed now.
4. When one speech mixes tabling, votes, deferrals and a new review, use only the LAST span
   that actually starts review, explanation or a report.
5. A speech cut off before any review/report/explanation phrase is not a trigger.

EXAMPLES
Speech: "의사일정 제1항부터 제47항까지 이상 47건의 법률안을 일괄하여 상정합니다. 그러면 의사일정 제1항부터 제3항까지 이상 3건의 법률안을 일괄하여 심사하도록 하겠습니다."
Output: {"order": 10, "trigger": true, "agenda_items": [1, 2, 3]}

Speech: "의사일정 제40항부터 제47항까지는 소위원회에서 계속 심사하도록 하겠습니다. 의사일정 제4항에 대해서 수석전문위원님께서 보고해 주시기 바랍니다."
Output: {"order": 299, "trigger": true, "agenda_items": [4]}

Speech: "… 의사일정 제4항 … 가결되었음을 선포합니다. 다음은 의사일정 제5항부터 제7항까지 이상 3건을 일괄하여 심사하도록 하겠습니다."
Output: {"order": 345, "trigger": true, "agenda_items": [5, 6, 7]}

Speech: "가결되었음을 선포합니다. 다시 1항부터 19항으로 돌아가겠습니다."
Output: {"order": 450, "trigger": true, "agenda_items": [1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16, 17, 18, 19]}

Speech: "수석전문위원님, 의사일정 제38항과 제39항에 대하여 설명하여 주시기 바랍니다."
Output: {"order": 510, "trigger": true, "agenda_items": [38, 39]}

Speech: "그러면 오늘 방금 심사한 의사일정 제6항부터 제11항까지는 보다 심도 있는 논의를 위해서 계속 심사하도록 하겠습니다."
Output: {"order": 530, "trigger": false, "agenda_items": []}

Speech: "의사일정 제49항부터 제57항까지 이상 9건의 농수산물 유통 및 가격안정에 관한……"
Output: {"order": 611, "trigger": false, "agenda_items": []}

Speech: "의사일정 제19항 및 제20항의 2건의 제정법률안과 의사일정 제21항부터 제24항까지 4건의 개정법률안, 의사일정 제35항까지 총 7개의 법률안을 일괄하여 심사하겠습니다. 전문위원 보고해 주세요."
Output: {"order": 702, "trigger": true, "agenda_items": [19, 20, 21, 22, 23, 24, 35]}"#;

/// Build the classification request for a meeting's candidates
pub fn build_trigger_request(candidates: &[&Speech], pool: &BillPool) -> OracleRequest {
    OracleRequest {
        system: SYSTEM_PROMPT.to_string(),
        user: build_trigger_prompt(candidates, pool),
    }
}

/// Build the user prompt: candidate speeches followed by the agenda
pub fn build_trigger_prompt(candidates: &[&Speech], pool: &BillPool) -> String {
    let mut prompt = String::new();

    prompt.push_str("# Chair speeches\n");
    prompt.push_str("Use the bracketed number as \"order\".\n\n");
    let chair_block: Vec<String> = candidates
        .iter()
        .map(|s| format!("[{}] {}: {}", s.order, s.speaker_name, s.text))
        .collect();
    prompt.push_str(&chair_block.join("\n\n"));
    prompt.push_str("\n\n");

    prompt.push_str("# Agenda\n");
    prompt.push_str("Item numbers correspond to 의사일정 제N항.\n\n");
    for line in pool.lines() {
        prompt.push_str(&line);
        prompt.push('\n');
    }
    prompt.push('\n');

    prompt.push_str("# Task\n");
    prompt.push_str(&format!(
        "Return the JSON array with exactly {} objects, one per chair speech above.\n",
        candidates.len()
    ));

    prompt
}
