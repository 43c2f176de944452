//! Known MLB umpire names, for listing and quick search.

/// Umpires known to have scorecard pages.
pub const KNOWN_UMPIRES: &[&str] = &[
    "Angel Hernandez",
    "Joe West",
    "Jerry Meals",
    "CB Bucknor",
    "Laz Diaz",
    "Ron Kulpa",
    "Pat Hoberg",
    "Adam Beck",
    "Mark Ripperger",
    "Dan Bellino",
    "Chris Guccione",
    "Nic Lentz",
    "Will Little",
    "James Hoye",
    "Hunter Wendelstedt",
    "Tom Hallion",
    "Todd Tichenor",
    "Tripp Gibson",
    "Ryan Additon",
    "Sean Barber",
];

/// Case-insensitive substring search over [`KNOWN_UMPIRES`], in roster order.
pub fn search(pattern: &str) -> Vec<&'static str> {
    let pattern = pattern.trim().to_lowercase();
    KNOWN_UMPIRES
        .iter()
        .copied()
        .filter(|name| name.to_lowercase().contains(&pattern))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search() {
        assert_eq!(search("angel"), vec!["Angel Hernandez"]);
        assert_eq!(search("HO"), vec!["Pat Hoberg", "James Hoye"]);
        assert!(search("zzz").is_empty());
        assert_eq!(search("").len(), KNOWN_UMPIRES.len());
    }
}
