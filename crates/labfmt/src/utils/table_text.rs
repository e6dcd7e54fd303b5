/// Lines of `key value` pairs with the values aligned in one column.
pub fn get_table_lines(items: &[(&str, &str)], indent: usize) -> Vec<String> {
  let largest_key_len = get_largest_string_len(items.iter().map(|(key, _)| *key));

  items
    .iter()
    .map(|(key, value)| {
      let mut text = " ".repeat(indent);
      text.push_str(key);
      if !value.is_empty() {
        text.push_str(&" ".repeat(largest_key_len - key.chars().count() + 1));
        text.push_str(value);
      }
      text
    })
    .collect()
}

fn get_largest_string_len<'a>(items: impl Iterator<Item = &'a str>) -> usize {
  let mut key_lens = items.map(|item| item.chars().count()).collect::<Vec<_>>();
  key_lens.sort_unstable();
  key_lens.pop().unwrap_or(0)
}
