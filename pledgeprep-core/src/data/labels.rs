//! Fixed mapping between integer class codes and label names.

/// `id2label`: class code to name.
pub static ID2LABEL: &[(i64, &str)] = &[(0, "no pledge"), (1, "pledge")];

/// `label2id`: name to class code.
pub static LABEL2ID: &[(&str, i64)] = &[("no pledge", 0), ("pledge", 1)];

pub fn id_to_label(id: i64) -> Option<&'static str> {
    ID2LABEL
        .iter()
        .find(|(code, _)| *code == id)
        .map(|(_, name)| *name)
}

pub fn label_to_id(label: &str) -> Option<i64> {
    LABEL2ID
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, code)| *code)
}

/// Map a raw `label` cell to its name. Surrounding whitespace is ignored;
/// anything that is not an integer code from [`ID2LABEL`] yields `None`.
pub fn map_cell(cell: &str) -> Option<&'static str> {
    cell.trim().parse::<i64>().ok().and_then(id_to_label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mapping_is_a_bijection() {
        assert_eq!(ID2LABEL.len(), LABEL2ID.len());
        for (code, name) in ID2LABEL {
            assert_eq!(label_to_id(name), Some(*code));
            assert_eq!(id_to_label(*code), Some(*name));
        }
    }

    #[test]
    fn test_map_cell() {
        assert_eq!(map_cell("0"), Some("no pledge"));
        assert_eq!(map_cell(" 1 "), Some("pledge"));
        assert_eq!(map_cell("2"), None);
        assert_eq!(map_cell("-1"), None);
        assert_eq!(map_cell("1.0"), None);
        assert_eq!(map_cell(""), None);
        assert_eq!(map_cell("pledge"), None);
    }
}
