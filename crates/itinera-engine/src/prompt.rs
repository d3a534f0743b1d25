//! Prompt Builder: renders the pipeline state into the generation prompt.
//!
//! The policy for follow-up turns (keep the previous plan, only amend what the
//! new message asks for) is carried purely by the prompt text.

use itinera_core::state::{PipelineState, Role, StatePatch};

const PERSONA: &str = "Bạn là một chuyên gia lập kế hoạch du lịch. \
Hãy lên kế hoạch du lịch chi tiết dựa trên yêu cầu của người dùng.";

const HISTORY_HEADER: &str = "Lịch sử hội thoại trước đó:";

const FOLLOW_UP_POLICY: &str = "Đây là yêu cầu tiếp nối cuộc hội thoại trên. \
Hãy giữ nguyên cấu trúc lịch trình đã đưa ra trước đó và chỉ điều chỉnh \
những phần mà yêu cầu mới thực sự cần thay đổi.";

const REQUEST_HEADER: &str = "Yêu cầu hiện tại của người dùng:";

const CHECKLIST: &str = "Hãy bao gồm:
- Lịch trình theo ngày
- Địa điểm tham quan
- Gợi ý ăn uống
- Phương tiện di chuyển
- Chi phí ước tính

Trả lời bằng tiếng Việt.";

const ROUTE_INSTRUCTION: &str = "BẮT BUỘC: Ở cuối câu trả lời, hãy thêm một khối JSON \
mô tả lộ trình theo từng ngày, đúng định dạng sau (mỗi địa điểm gồm tên, vĩ độ, kinh độ \
và thời gian dự kiến):";

const ROUTE_EXAMPLE: &str = r#"```json
{
  "route": {
    "day1": [
      {"name": "Tên địa điểm", "latitude": 11.9404, "longitude": 108.4583, "time": "08:00"}
    ],
    "day2": []
  }
}
```"#;

/// Transcript label for a history entry.
fn speaker(role: Role) -> &'static str {
    match role {
        Role::User => "Person",
        Role::Assistant => "Bot",
    }
}

/// Render the full prompt for a state. Never fails.
pub fn build_prompt(state: &PipelineState) -> String {
    let mut prompt = String::from(PERSONA);
    prompt.push_str("\n\n");

    if !state.history.is_empty() {
        prompt.push_str(HISTORY_HEADER);
        prompt.push('\n');
        for entry in &state.history {
            prompt.push_str(speaker(entry.role));
            prompt.push_str(": ");
            prompt.push_str(&entry.content);
            prompt.push('\n');
        }
        prompt.push('\n');
        prompt.push_str(FOLLOW_UP_POLICY);
        prompt.push_str("\n\n");
    }

    prompt.push_str(REQUEST_HEADER);
    prompt.push('\n');
    prompt.push_str(&state.user_input);
    prompt.push_str("\n\n");
    prompt.push_str(CHECKLIST);
    prompt.push_str("\n\n");
    prompt.push_str(ROUTE_INSTRUCTION);
    prompt.push('\n');
    prompt.push_str(ROUTE_EXAMPLE);

    prompt
}

/// PreprocessInput stage body.
pub fn preprocess_input(state: &PipelineState) -> StatePatch {
    StatePatch::prompt(build_prompt(state))
}
