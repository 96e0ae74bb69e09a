//! Video prompt structure and template defaults.
//!
//! The section texts are the production template the brand shoots against.
//! `action` carries the `ENTER SCRIPT FROM POST HERE` placeholder that the
//! builder replaces with the post's dialogue.

use serde::{Deserialize, Serialize};

/// Placeholder in the action template replaced with the spoken script.
pub const SCRIPT_PLACEHOLDER: &str = "ENTER SCRIPT FROM POST HERE";

/// Closing pause marker appended to every dialogue line.
pub const CLOSING_PAUSE_MARKER: &str = "(stiller Halt)";

/// Audio capture directive, stored on the audio section's dialogue field so
/// providers receive recording guidance separate from capture notes.
pub const AUDIO_DIALOGUE_DIRECTIVE: &str = "Audio: Recorded through modern smartphone mic — clear, front-facing voice with intimate presence and a soft, short living-room bloom (RT60 ≈ 0.3–0.4 s). Camera 20–30 cm from mouth, mic unobstructed. HVAC/appliances off; noise floor ≤ –55 dBFS with a faint, even room-tone bed. No music, one-take natural pacing.";

const CHARACTER_TEMPLATE: &str = "Character: 38-year-old German woman with long, damp, light brown hair with natural blonde highlights; hazel, almond-shaped eyes with subtle eye wrinkles (fine crow’s feet) at the outer corners; a friendly oval face; soft forehead lines (fine horizontal expression lines) that are faint at rest; gentle laugh lines (light nasolabial folds) framing the mouth; and a warm light-medium skin tone with neutral undertones. She is looking directly at the camera with a neutral, friendly expression. Filmed on an iPhone 15 Pro, bright soft vanity lighting, neutral clean color palette, hyper-realistic skin texture with visible pores..";

/// Action template containing [`SCRIPT_PLACEHOLDER`].
pub const ACTION_TEMPLATE: &str = "Action: Sits in a wheelchair in the bedroom, hair still slightly damp, looking directly into camera with a neutral, friendly expression that turns to a gentle smile. Maintains steady head-and-shoulders orientation; uses small, natural hand gestures and subtle upper-body nods while speaking. Remains seated and centered for a single continuous take with no cuts or alternate angles and says: ENTER SCRIPT FROM POST HERE";

const STYLE_TEMPLATE: &str = "Style: Smartphone selfie, UGC authenticity: bright vanity lighting, neutral clean color palette, hyper-realistic skin texture with visible pores, influencer-style monologue and direct-to-camera delivery. Raw, unfiltered TikTok aesthetic with natural skin tone and no filters.";

const SCENE_TEMPLATE: &str = "Scene: The woman is sitting on a wheelchair in a brightly lit modern bedroom with pink walls. Clean, minimal décor. Natural daylight streams through an unseen window camera-right, supplemented by soft ambient lighting creating even, flattering illumination across the space.";

const CINEMATOGRAPHY_TEMPLATE: &str = "Cinematography: Camera Shot: Medium close-up from a slightly high angle, with centered framing that keeps her head and shoulders in the shot. This camera shot does not change during the whole take. Lens & DOF: modern smartphone front camera (~24 mm equiv.), deep depth of field keeping the background in focus with a natural subtle falloff. Camera Motion: Subtle handheld sway and jitter consistent with a selfie grip, including very slight natural arm movements as she speaks and gestures.";

const LIGHTING_TEMPLATE: &str = "Lighting: Bright, soft, diffuse frontal light  illuminating her face evenly. Soft shadows are visible behind her.";

const COLOR_AND_GRADE_TEMPLATE: &str = "Color & Grade: modern smartphone  HDR auto-tone; a neutral clean color palette; natural skin texture with visible pores is preserved; no filters are applied.";

const RESOLUTION_TEMPLATE: &str = "Resolution & Aspect Ratio: 720x1280, 30 fps, vertical.";

const CAMERA_POSITIONING_TEMPLATE: &str = "Camera positioning & movement: Medium close-up from a slightly high angle, centered framing that keeps head and shoulders fully in frame. Front-facing modern smartphone (~24 mm equiv.) held at selfie distance (camera ~20–30 cm from face). Subtle handheld sway and micro arm jitter consistent with a selfie grip; no intentional camera moves or cuts. Maintain framing and facial positioning to match the Golden Face/Look Anchor precisely.";

const COMPOSITION_TEMPLATE: &str = "Composition: Head-and-shoulders centered composition with wheelchair visible in frame and the modern bedroom environment apparent behind her. Pink walls and clean, minimal décor remain visible; natural daylight camera-right provides directional fill while soft ambient lights even out the scene. Background kept legible and consistent, not distracting from the subject.";

const FOCUS_TEMPLATE: &str = "Focus & lens effects: Face-priority autofocus locked on her eyes; deep depth of field with background in focus and a natural, subtle falloff. No focus hunting, no warp or flicker. Preserve skin texture and pores; no heavy bokeh, no digital smoothing or beauty filters. Modern smartphone HDR auto-tone preserved; maintain consistent white balance and colorimetry throughout the take.";

const ATMOSPHERE_TEMPLATE: &str = "Atmosphere: Bright, soft, diffuse frontal illumination with flattering, even highlights and gentle shadows behind the subject. Clean, neutral, modern bedroom vibe with daylight warmth balanced by soft ambient lights. Authentic, minimal aesthetic — uncluttered, airy, and intimate without dramatic contrast or stylized color grading.";

const AUTHENTICITY_TEMPLATE: &str = "Authenticity/UGC Modifiers: smartphone selfie, handheld realism, living room review, bright vanity lighting, influencer-style monologue, direct-to-camera, product review, raw unfiltered TikTok aesthetic, real voice, micro hand jitters, seamless one-take.";

const NEGATIVES_TEMPLATE: &str = "Universal Negatives (hard constraints): subtitles, captions, watermark, text overlays, words on screen, logo, branding, poor lighting, blurry footage, low resolution, artifacts, unwanted objects, inconsistent character appearance, audio sync issues, amateur quality, cartoon effects, unrealistic proportions, distorted hands, artificial lighting, oversaturation, compression noise, excessive camera shake.";

const POST_TEMPLATE: &str = "Post: gentle HPF @ 80 Hz, light 3:1 compression (≈–3 dB GR), subtle de-ess around 6–8 kHz; peaks capped at –1 dBTP, delivery loudness around –14 LUFS integrated.";

const SOUND_EFFECTS_TEMPLATE: &str = "Sound effects (SFX): Recorded through modern smartphone mic — clear, front-facing voice with intimate presence. Post notes: gentle HPF @ 80 Hz, light 3:1 compression (≈–3 dB GR), subtle de-ess around 6–8 kHz; peaks capped at –1 dBTP, delivery loudness around –14 LUFS integrated.";

const CAPTURE_TEMPLATE: &str = "Audio: Recorded through modern smartphone mic — clear, front-facing voice with intimate presence and a soft, short living-room bloom (RT60 ≈ 0.3–0.4 s). Camera 20–30 cm from mouth, mic unobstructed. HVAC/appliances off; noise floor ≤ –55 dBFS with a faint, even room-tone bed. No music, one-take natural pacing.";

/// Audio section of a video prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AudioSection {
    /// Spoken dialogue guidance.
    pub dialogue: String,
    /// Capture description.
    #[serde(default = "default_capture")]
    pub capture: String,
}

fn default_capture() -> String {
    CAPTURE_TEMPLATE.to_string()
}

impl Default for AudioSection {
    fn default() -> Self {
        Self {
            dialogue: AUDIO_DIALOGUE_DIRECTIVE.to_string(),
            capture: default_capture(),
        }
    }
}

/// Complete video generation prompt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct VideoPrompt {
    pub character: String,
    pub action: String,
    pub style: String,
    pub scene: String,
    pub cinematography: String,
    pub lighting: String,
    pub color_and_grade: String,
    pub resolution_and_aspect_ratio: String,
    pub camera_positioning_and_motion: String,
    pub composition: String,
    pub focus_and_lens_effects: String,
    pub atmosphere: String,
    pub authenticity_modifiers: String,
    pub universal_negatives: String,
    pub audio: AudioSection,
    pub post: String,
    pub sound_effects: String,
}

impl Default for VideoPrompt {
    fn default() -> Self {
        Self {
            character: CHARACTER_TEMPLATE.to_string(),
            action: ACTION_TEMPLATE.to_string(),
            style: STYLE_TEMPLATE.to_string(),
            scene: SCENE_TEMPLATE.to_string(),
            cinematography: CINEMATOGRAPHY_TEMPLATE.to_string(),
            lighting: LIGHTING_TEMPLATE.to_string(),
            color_and_grade: COLOR_AND_GRADE_TEMPLATE.to_string(),
            resolution_and_aspect_ratio: RESOLUTION_TEMPLATE.to_string(),
            camera_positioning_and_motion: CAMERA_POSITIONING_TEMPLATE.to_string(),
            composition: COMPOSITION_TEMPLATE.to_string(),
            focus_and_lens_effects: FOCUS_TEMPLATE.to_string(),
            atmosphere: ATMOSPHERE_TEMPLATE.to_string(),
            authenticity_modifiers: AUTHENTICITY_TEMPLATE.to_string(),
            universal_negatives: NEGATIVES_TEMPLATE.to_string(),
            audio: AudioSection::default(),
            post: POST_TEMPLATE.to_string(),
            sound_effects: SOUND_EFFECTS_TEMPLATE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_template_carries_placeholder() {
        let prompt = VideoPrompt::default();
        assert!(prompt.action.contains(SCRIPT_PLACEHOLDER));
    }

    #[test]
    fn test_prompt_round_trips_through_json() {
        let prompt = VideoPrompt::default();
        let json = serde_json::to_string(&prompt).unwrap();
        let parsed: VideoPrompt = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, prompt);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let parsed: VideoPrompt =
            serde_json::from_str(r#"{"action":"Action: says: hello (stiller Halt)"}"#).unwrap();
        assert_eq!(parsed.action, "Action: says: hello (stiller Halt)");
        assert_eq!(parsed.style, VideoPrompt::default().style);
        assert_eq!(parsed.audio.dialogue, AUDIO_DIALOGUE_DIRECTIVE);
    }
}
