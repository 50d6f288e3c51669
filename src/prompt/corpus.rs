//! Static fragment pools and the content filter.

use rand::Rng;

use super::fragments::FragmentKind;

/// Abstract nouns that make a prompt hard to draw.
pub const BANNED_WORDS: [&str; 7] = [
    "echo", "emotion", "thought", "concept", "idea", "soul", "memory",
];

/// Single, concrete characters.
pub const CHARACTERS: [&str; 50] = [
    "solitary astronaut",
    "cyborg geologist",
    "child in a paper crown",
    "elderly apothecary",
    "retired pirate",
    "urban explorer",
    "novice witch",
    "robot gardener",
    "eccentric inventor",
    "time-traveling librarian",
    "time-traveling archaeologist",
    "robotic beekeeper",
    "octopus magician",
    "alien cartographer",
    "wandering monk",
    "vampire seamstress",
    "fossilized child",
    "mechanical knight",
    "desert nomad",
    "garden ghost",
    "mirror polisher",
    "storm chaser",
    "troll florist",
    "shadow puppeteer",
    "foggy hunter",
    "umbrella mechanic",
    "soap bubble scientist",
    "green goblin",
    "cloud shepherd",
    "neon beekeeper",
    "glowing oracle",
    "broom technician",
    "radioactive hermit",
    "tree whisperer",
    "robotic stargazer",
    "glowing child",
    "crystal warrior",
    "mossy traveler",
    "ice explorer",
    "fire dancer",
    "marble giant",
    "fog phantom",
    "neon child",
    "silver knight",
    "hollow-eyed priest",
    "owl-masked stranger",
    "desert oracle",
    "swamp goblin",
    "mirror twin",
    "ink-covered hunter",
];

/// Concrete, visible actions.
pub const ACTIONS: [&str; 50] = [
    "planting luminous seeds",
    "adjusting sails",
    "repairing a torn flag",
    "mapping uncharted islands",
    "mixing potions",
    "photographing ruins",
    "deciphering ancient runes",
    "skipping stones",
    "tending mechanical bees",
    "creating a mural",
    "brewing tea",
    "carving ice sculptures",
    "testing a jetpack",
    "performing tricks",
    "building a strange contraption",
    "scanning alien fossils",
    "conducting lightning",
    "chasing glowing insects",
    "harnessing moonlight",
    "casting shadows on a wall",
    "examining a glowing crystal",
    "watering upside-down plants",
    "painting with lasers",
    "sifting through stardust",
    "programming a robot",
    "translating runes",
    "calibrating instruments",
    "folding enchanted paper",
    "measuring echoes",
    "building a bridge of vines",
    "collecting floating stones",
    "sculpting light",
    "repairing torn maps",
    "etching symbols into stone",
    "testing anti-gravity boots",
    "tuning a musical windmill",
    "juggling glowing orbs",
    "unpacking strange cargo",
    "casting bubbles into the air",
    "feeding robotic birds",
    "balancing on a tightrope",
    "throwing fire petals",
    "spinning gold thread",
    "lighting ceremonial candles",
    "assembling a puzzle sphere",
    "polishing a glowing amulet",
    "illuminating constellations",
    "welding magical armor",
    "catching lightning in jars",
    "whistling to summon wind",
];

/// Vivid locations, each starting with a preposition.
pub const LOCATIONS: [&str; 50] = [
    "in a candle-lit laboratory",
    "on a desert ghost ship",
    "in a cyberpunk alleyway",
    "in a sunken temple",
    "in a lush greenhouse",
    "on a foggy mountain peak",
    "at the rim of a glowing crater",
    "in a floating garden",
    "in an abandoned amusement park",
    "in a futuristic greenhouse",
    "on the surface of Mars",
    "on a glass bridge at dawn",
    "in a neon jungle",
    "on the roof of a Victorian mansion",
    "in a crystal cave",
    "on the side of a rusted space shuttle",
    "in a forest glade",
    "in the ruins of an ancient castle",
    "on the deck of an ancient galleon",
    "in a dreamlike desert",
    "in a bioluminescent swamp",
    "in a haunted train station",
    "in a vibrant underwater reef",
    "in a city suspended in air",
    "in an alien jungle",
    "in a steam-powered city",
    "in a glowing moonbase",
    "in a snow-covered plaza",
    "in a volcanic observatory",
    "inside a giant clock",
    "in a glowing coral forest",
    "in a cave of frozen time",
    "in a marketplace at twilight",
    "in a mountaintop observatory",
    "in a field of glass flowers",
    "in a dome beneath the sea",
    "in a crater under a purple sky",
    "in a mirrored canyon",
    "on a river of stars",
    "behind a hidden waterfall",
    "in a shipwreck lit by fireflies",
    "in an ancient sculpture garden",
    "in a stilted bamboo village",
    "on a monorail high above clouds",
    "in a bioluminescent cave",
    "in a marketplace built into cliffs",
    "in a toxic jungle lit by sparks",
    "in a hanging stone monastery",
    "in a twisted metal scrapyard",
    "among floating rocks in a valley",
];

/// Pool backing a fragment kind.
#[must_use]
pub const fn pool(kind: FragmentKind) -> &'static [&'static str] {
    match kind {
        FragmentKind::Character => &CHARACTERS,
        FragmentKind::Action => &ACTIONS,
        FragmentKind::Location => &LOCATIONS,
    }
}

/// Draw one fragment uniformly at random.
pub fn sample<R: Rng>(kind: FragmentKind, rng: &mut R) -> &'static str {
    let pool = pool(kind);
    pool[rng.gen_range(0..pool.len())]
}

/// True if the text mentions a banned abstract noun (case-insensitive substring).
#[must_use]
pub fn is_too_abstract(text: &str) -> bool {
    let lowered = text.to_lowercase();
    BANNED_WORDS.iter().any(|word| lowered.contains(word))
}

/// Normalize a prompt for duplicate detection (trim, lowercase, collapse whitespace).
#[must_use]
pub fn normalize(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    let mut prev_space = false;

    for ch in text.trim().chars() {
        if ch.is_whitespace() {
            if !prev_space {
                normalized.push(' ');
                prev_space = true;
            }
        } else {
            for lower in ch.to_lowercase() {
                normalized.push(lower);
            }
            prev_space = false;
        }
    }

    normalized
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_normalize_collapses_and_lowercases() {
        assert_eq!(
            normalize("A  Fox  is   Jumping."),
            normalize("a fox is jumping.")
        );
        assert_eq!(normalize("  A\tFox\n is  "), "a fox is");
    }

    #[test]
    fn test_abstract_filter() {
        assert!(is_too_abstract("A monk is guarding a MEMORY in a temple."));
        assert!(is_too_abstract("A storm chaser is measuring echoes in a crystal cave."));
        assert!(!is_too_abstract("A retired pirate is brewing tea in a sunken temple."));
    }

    #[test]
    fn test_pools_are_non_empty_and_disjoint() {
        let characters: HashSet<_> = CHARACTERS.iter().collect();
        let actions: HashSet<_> = ACTIONS.iter().collect();
        let locations: HashSet<_> = LOCATIONS.iter().collect();

        assert_eq!(characters.len(), CHARACTERS.len());
        assert_eq!(actions.len(), ACTIONS.len());
        assert_eq!(locations.len(), LOCATIONS.len());
        assert!(characters.is_disjoint(&actions));
        assert!(characters.is_disjoint(&locations));
        assert!(actions.is_disjoint(&locations));
    }

    #[test]
    fn test_sample_draws_from_matching_pool() {
        let mut rng = rand::thread_rng();
        for kind in FragmentKind::ALL {
            for _ in 0..20 {
                assert!(pool(kind).contains(&sample(kind, &mut rng)));
            }
        }
    }
}
