// Spoken phrasings for alerts, per language and zone.
//
// Each template carries the urgency its wording conveys; "{label}" is
// replaced with the spoken label.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::model::Urgency;
use crate::core::labels::Language;
use crate::core::zone::Zone;

type Template = (&'static str, Urgency);

/// A rendered phrase ready for the speech device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phrase {
    pub text: String,
    pub urgency: Urgency,
}

/// Chooses one of several equivalent phrasings.
pub trait PhraseSelector: Send {
    /// Index in `0..choices`. `choices` is never zero.
    fn pick(&mut self, choices: usize) -> usize;
}

/// Varies phrasing so repeated alerts sound less robotic.
pub struct RandomPhrase {
    rng: StdRng,
}

impl RandomPhrase {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomPhrase {
    fn default() -> Self {
        Self::new()
    }
}

impl PhraseSelector for RandomPhrase {
    fn pick(&mut self, choices: usize) -> usize {
        self.rng.gen_range(0..choices)
    }
}

/// Always the same phrasing (wrapping if out of range).
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedPhrase(pub usize);

impl PhraseSelector for FixedPhrase {
    fn pick(&mut self, choices: usize) -> usize {
        self.0 % choices
    }
}

fn render(templates: &[Template], label: &str, selector: &mut dyn PhraseSelector) -> Phrase {
    let (text, urgency) = templates[selector.pick(templates.len())];
    Phrase {
        text: text.replace("{label}", label),
        urgency,
    }
}

pub fn critical(label: &str, language: Language, selector: &mut dyn PhraseSelector) -> Phrase {
    render(critical_templates(language), label, selector)
}

pub fn routine(
    label: &str,
    zone: Zone,
    language: Language,
    selector: &mut dyn PhraseSelector,
) -> Phrase {
    let templates = match language {
        Language::English => english_zone(zone),
        Language::Chinese => chinese_zone(zone),
    };
    render(templates, label, selector)
}

fn critical_templates(language: Language) -> &'static [Template] {
    use Urgency::Danger;
    match language {
        Language::English => &[
            ("Danger! {label} directly ahead", Danger),
            ("Danger! {label} approaching", Danger),
            ("Danger! {label} very close", Danger),
        ],
        Language::Chinese => &[
            ("危险！正前方发现{label}", Danger),
            ("危险！{label},接近中", Danger),
            ("危险！{label},靠近", Danger),
        ],
    }
}

fn english_zone(zone: Zone) -> &'static [Template] {
    use Urgency::{Caution, Plain};
    match zone {
        Zone::FarLeft => &[("Caution! {label} at far left", Caution), ("{label}, far left", Plain)],
        Zone::Left => &[("{label} on your left", Plain), ("{label} detected to the left", Plain)],
        Zone::LeftLeaningRight => &[
            ("{label} on the left, leaning right", Plain),
            ("{label} left, toward center", Plain),
        ],
        Zone::FrontLeftLeaningLeft => &[
            ("{label} ahead left, leaning left", Plain),
            ("{label} front left, toward the left", Plain),
        ],
        Zone::FrontLeft => &[("{label} ahead on the left", Plain), ("{label}, front left", Plain)],
        Zone::FrontLeftLeaningRight => &[
            ("{label} ahead left, leaning right", Plain),
            ("{label} front left, toward center", Plain),
        ],
        Zone::FrontWide => &[("Large {label} directly ahead", Plain), ("Wide {label} ahead", Plain)],
        Zone::FrontLeaningLeft => &[
            ("{label} ahead, slightly left", Plain),
            ("{label} in front, leaning left", Plain),
        ],
        Zone::Front => &[("{label} straight ahead", Plain), ("{label} detected ahead", Plain)],
        Zone::FrontLeaningRight => &[
            ("{label} ahead, slightly right", Plain),
            ("{label} in front, leaning right", Plain),
        ],
        Zone::FrontRightLeaningLeft => &[
            ("{label} ahead right, leaning left", Plain),
            ("{label} front right, toward center", Plain),
        ],
        Zone::FrontRight => &[("{label} ahead on the right", Plain), ("{label}, front right", Plain)],
        Zone::FrontRightLeaningRight => &[
            ("{label} ahead right, leaning right", Plain),
            ("{label} front right, toward the right", Plain),
        ],
        Zone::RightLeaningLeft => &[
            ("{label} on the right, leaning left", Plain),
            ("{label} right, toward center", Plain),
        ],
        Zone::Right => &[("{label} on your right", Plain), ("{label} detected to the right", Plain)],
        Zone::FarRight => &[("Caution! {label} at far right", Caution), ("{label}, far right", Plain)],
    }
}

fn chinese_zone(zone: Zone) -> &'static [Template] {
    use Urgency::{Caution, Plain};
    match zone {
        Zone::FarLeft => &[("注意！最左侧发现{label}", Caution), ("{label},位于最左边区域", Plain)],
        Zone::Left => &[("您的左侧有{label}", Plain), ("检测到左侧存在{label}", Plain)],
        Zone::LeftLeaningRight => &[("左侧偏右位置检测到{label}", Plain), ("{label},在左侧靠右区域", Plain)],
        Zone::FrontLeftLeaningLeft => &[("左前方偏左位置有{label}", Plain), ("检测到左前方左侧存在{label}", Plain)],
        Zone::FrontLeft => &[("左前方发现{label}", Plain), ("{label},位于左前方", Plain)],
        Zone::FrontLeftLeaningRight => &[("左前方偏右位置检测到{label}", Plain), ("{label},在左前方靠右区域", Plain)],
        Zone::FrontWide => &[("正前方检测到大型{label}", Plain), ("大面积{label},位于正前方", Plain)],
        Zone::FrontLeaningLeft => &[("正前方偏左位置有{label}", Plain), ("{label},在正前方靠左区域", Plain)],
        Zone::Front => &[("正前方发现{label}", Plain), ("检测到正前方存在{label}", Plain)],
        Zone::FrontLeaningRight => &[("正前方偏右位置检测到{label}", Plain), ("{label},在正前方靠右区域", Plain)],
        Zone::FrontRightLeaningLeft => &[("右前方偏左位置有{label}", Plain), ("检测到右前方左侧存在{label}", Plain)],
        Zone::FrontRight => &[("右前方发现{label}", Plain), ("{label},位于右前方", Plain)],
        Zone::FrontRightLeaningRight => &[("右前方偏右位置检测到{label}", Plain), ("{label},在右前方靠右区域", Plain)],
        Zone::RightLeaningLeft => &[("右侧偏左位置有{label}", Plain), ("检测到右侧靠左区域存在{label}", Plain)],
        Zone::Right => &[("您的右侧有{label}", Plain), ("检测到右侧存在{label}", Plain)],
        Zone::FarRight => &[("注意！最右侧发现{label}", Caution), ("{label},位于最右边区域", Plain)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_zone_has_phrases() {
        for zone in Zone::all() {
            for language in [Language::English, Language::Chinese] {
                let phrase = routine("cup", *zone, language, &mut FixedPhrase(0));
                assert!(phrase.text.contains("cup"), "{zone} / {language}");
            }
        }
    }

    #[test]
    fn test_far_zones_sound_cautious() {
        let phrase = routine("dog", Zone::FarLeft, Language::English, &mut FixedPhrase(0));
        assert_eq!(phrase.text, "Caution! dog at far left");
        assert_eq!(phrase.urgency, Urgency::Caution);

        let phrase = routine("dog", Zone::FarRight, Language::English, &mut FixedPhrase(1));
        assert_eq!(phrase.urgency, Urgency::Plain);
    }

    #[test]
    fn test_critical_phrases() {
        let phrase = critical("car", Language::English, &mut FixedPhrase(1));
        assert_eq!(phrase.text, "Danger! car approaching");
        assert_eq!(phrase.urgency, Urgency::Danger);
    }

    #[test]
    fn test_seeded_selection_is_reproducible() {
        let mut a = RandomPhrase::seeded(7);
        let mut b = RandomPhrase::seeded(7);
        let picks_a: Vec<_> = (0..20).map(|_| a.pick(3)).collect();
        let picks_b: Vec<_> = (0..20).map(|_| b.pick(3)).collect();
        assert_eq!(picks_a, picks_b);
        assert!(picks_a.iter().all(|i| *i < 3));
    }

    #[test]
    fn test_fixed_phrase_wraps() {
        assert_eq!(FixedPhrase(5).pick(2), 1);
    }
}
