//! Short Korean comment shown alongside the recommendations.

use crate::emotion::{Intensity, Quadrant};

/// Shown for neutral diaries, whatever the quadrant.
pub const NEUTRAL_COMMENT: &str = "평범한 하루를 보내셨군요.";

/// Shown when the labels don't name a known class.
pub const FALLBACK_COMMENT: &str = "기분이 복잡하셨던 것 같아요.";

/// Comment for a classified emotion.
pub fn comment_for(quadrant: Quadrant, intensity: Intensity) -> &'static str {
    use Intensity::{High, Low, Medium, Neutral};
    use Quadrant::{First, Fourth, Second, Third};

    match (quadrant, intensity) {
        (_, Neutral) => NEUTRAL_COMMENT,

        (First, High) => "많이 행복한 하루를 보내셨군요! 내일도 오늘처럼 행복하세요",
        (First, Medium) => "행복한 기분이 느껴지네요.",
        (First, Low) => "조금 행복한 하루를 보내셨군요. 내일은 더 행복한 하루가 될거에요",

        (Second, High) => "아주 힘든 하루를 보내셨군요. 금방 훌훌 털어버리기를 바랄게요.",
        (Second, Medium) => "힘든 하루에 노래를 들으면서 잠시 쉬어보는건 어떨까요.",
        (Second, Low) => "조금 힘든 하루를 보내셨군요. 내일은 힘들지 않기를 바랄게요.",

        (Third, High) => "힘든 하루를 보내셨군요. 힘내세요!",
        (Third, Medium) => "많이 지치고 힘든 하루였군요.",
        (Third, Low) => "조금 힘든 하루였을 것 같아요.",

        (Fourth, High) => "아주 편안한 하루를 지내셨나봐요.",
        (Fourth, Medium) => "편안함이 느껴지네요. 재충전의 시간을 가져봐요",
        (Fourth, Low) => "평범한 일상에서 벗어나 잠시 휴식을 취해보는건 어떨까요?",
    }
}

/// Comment for raw labels, e.g. read back from storage.
///
/// Unknown quadrant numbers or intensity labels get [`FALLBACK_COMMENT`].
pub fn comment_for_labels(quadrant: u8, intensity: &str) -> &'static str {
    let Ok(intensity) = intensity.parse::<Intensity>() else {
        return FALLBACK_COMMENT;
    };
    if intensity == Intensity::Neutral {
        return NEUTRAL_COMMENT;
    }
    match Quadrant::try_from(quadrant) {
        Ok(q) => comment_for(q, intensity),
        Err(_) => FALLBACK_COMMENT,
    }
}
