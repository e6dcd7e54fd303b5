use similar::ChangeTag;
use similar::TextDiff;

/// Gets a string showing the difference between two strings.
pub fn get_difference(old_text: &str, new_text: &str) -> String {
  debug_assert!(old_text != new_text);

  // normalize newlines
  let old_text = old_text.replace("\r\n", "\n");
  let new_text = new_text.replace("\r\n", "\n");

  if old_text == new_text {
    return String::from(" | Text differed by line endings.");
  }

  let diff = TextDiff::from_lines(&old_text, &new_text);
  let mut text = String::new();
  for (i, group) in diff.grouped_ops(2).iter().enumerate() {
    if i > 0 {
      text.push_str("...\n");
    }
    for op in group {
      for change in diff.iter_changes(op) {
        let sign = match change.tag() {
          ChangeTag::Delete => "-",
          ChangeTag::Insert => "+",
          ChangeTag::Equal => " ",
        };
        let line_number = change.old_index().or(change.new_index()).map(|index| index + 1).unwrap_or(0);
        text.push_str(&format!("{}{:>4}| {}", sign, line_number, change.value()));
        if change.missing_newline() {
          text.push('\n');
        }
      }
    }
  }
  text
}
