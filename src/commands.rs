/// Command palette entries and autocomplete logic

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "refresh",
    aliases: &["r", "reload", "retry"],
    description: "Fetch the catalog again, skipping the cache",
  },
  Command {
    name: "categories",
    aliases: &["c", "category", "cat"],
    description: "Filter by category",
  },
  Command {
    name: "sort",
    aliases: &["s", "order"],
    description: "Change sort order",
  },
  Command {
    name: "clear",
    aliases: &["reset", "all"],
    description: "Clear search and category filter",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit vitrine",
  },
];

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.trim().to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = COMMANDS
    .iter()
    .filter_map(|cmd| match_rank(cmd, &input_lower).map(|rank| (cmd, rank)))
    .collect();

  // Stable, so equal ranks keep palette order
  matches.sort_by_key(|(_, rank)| *rank);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

/// Lower is better: exact name, exact alias, name prefix, alias prefix,
/// then substring matches.
fn match_rank(cmd: &Command, input: &str) -> Option<u32> {
  if cmd.name == input {
    Some(0)
  } else if cmd.aliases.contains(&input) {
    Some(1)
  } else if cmd.name.starts_with(input) {
    Some(2)
  } else if cmd.aliases.iter().any(|a| a.starts_with(input)) {
    Some(3)
  } else if cmd.name.contains(input) {
    Some(4)
  } else if cmd.aliases.iter().any(|a| a.contains(input)) {
    Some(5)
  } else {
    None
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match() {
    let suggestions = get_suggestions("sort");
    assert_eq!(suggestions[0].name, "sort");
  }

  #[test]
  fn test_alias_match_beats_prefix() {
    // "c" is an alias of categories and a prefix of clear
    let suggestions = get_suggestions("c");
    assert_eq!(suggestions[0].name, "categories");
    assert_eq!(suggestions[1].name, "clear");
  }

  #[test]
  fn test_prefix_match() {
    let suggestions = get_suggestions("ref");
    assert_eq!(suggestions[0].name, "refresh");
  }

  #[test]
  fn test_substring_match() {
    let suggestions = get_suggestions("ego");
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].name, "categories");
  }

  #[test]
  fn test_no_match() {
    assert!(get_suggestions("zzz").is_empty());
  }
}
