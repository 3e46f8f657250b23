use crate::db::models::Student;

/// Resolves an oracle-extracted code to a single roster entry.
pub(crate) trait StudentMatcher: Send + Sync {
    fn resolve<'a>(&self, roster: &'a [Student], extracted_code: &str) -> Option<&'a Student>;
}

/// Case-insensitive matcher: exact code equality first, then containment in
/// either direction. The first tier with candidates decides and must be
/// unambiguous.
///
/// A roster code found inside the extracted text only counts when it stands as
/// its own token (`"ID 852"` finds `852`, while `"852"` never finds `5`).
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SubstringCodeMatcher;

impl StudentMatcher for SubstringCodeMatcher {
    fn resolve<'a>(&self, roster: &'a [Student], extracted_code: &str) -> Option<&'a Student> {
        let needle = extracted_code.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }

        let exact: Vec<&Student> =
            roster.iter().filter(|student| normalized(student) == needle).collect();
        if !exact.is_empty() {
            return single(exact, extracted_code);
        }

        let partial: Vec<&Student> = roster
            .iter()
            .filter(|student| {
                let code = normalized(student);
                !code.is_empty() && (code.contains(&needle) || contains_token(&needle, &code))
            })
            .collect();

        single(partial, extracted_code)
    }
}

fn normalized(student: &Student) -> String {
    student.roster_code.trim().to_lowercase()
}

/// `true` when `token` occurs in `haystack` without alphanumeric neighbours.
fn contains_token(haystack: &str, token: &str) -> bool {
    haystack.match_indices(token).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + token.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

fn single<'a>(candidates: Vec<&'a Student>, extracted_code: &str) -> Option<&'a Student> {
    match candidates.as_slice() {
        [only] => Some(*only),
        [] => None,
        _ => {
            tracing::info!(
                extracted_code,
                candidates = candidates.len(),
                "Ambiguous student code; leaving submission unmatched"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::primitive_now_utc;

    fn student(id: &str, code: &str) -> Student {
        Student {
            id: id.to_string(),
            class_id: "class-1".to_string(),
            student_name: format!("Student {id}"),
            roster_code: code.to_string(),
            created_at: primitive_now_utc(),
        }
    }

    fn resolve<'a>(roster: &'a [Student], code: &str) -> Option<&'a str> {
        SubstringCodeMatcher.resolve(roster, code).map(|student| student.id.as_str())
    }

    #[test]
    fn exact_code_matches() {
        let roster = vec![student("s1", "852"), student("s2", "853")];

        assert_eq!(resolve(&roster, "852"), Some("s1"));
        assert_eq!(resolve(&roster, " 853 "), Some("s2"));
    }

    #[test]
    fn containment_works_in_both_directions() {
        let suffixed = vec![student("s1", "852-A"), student("s2", "901")];
        let prefixed = vec![student("s1", "852"), student("s2", "901")];

        assert_eq!(resolve(&suffixed, "852"), Some("s1"));
        assert_eq!(resolve(&prefixed, "ID 852"), Some("s1"));
    }

    #[test]
    fn short_roster_code_inside_extracted_code_is_not_a_match() {
        let roster = vec![student("five", "5"), student("s2", "901")];

        assert_eq!(resolve(&roster, "852"), None);
        assert_eq!(resolve(&roster, "student 5"), Some("five"));
        assert_eq!(resolve(&roster, "No. 5, row 2"), Some("five"));
    }

    #[test]
    fn comparison_ignores_case() {
        let roster = vec![student("s1", "ab-12")];

        assert_eq!(resolve(&roster, "AB-12"), Some("s1"));
    }

    #[test]
    fn exact_tier_wins_over_containment() {
        let roster = vec![student("s1", "85"), student("s2", "852")];

        assert_eq!(resolve(&roster, "852"), Some("s2"));
    }

    #[test]
    fn unknown_or_ambiguous_codes_stay_unresolved() {
        let roster = vec![student("s1", "852-A"), student("s2", "852-B")];

        assert_eq!(resolve(&roster, "999"), None);
        assert_eq!(resolve(&roster, "852"), None);
        assert_eq!(resolve(&roster, "   "), None);
        assert_eq!(resolve(&[], "852"), None);
    }
}
