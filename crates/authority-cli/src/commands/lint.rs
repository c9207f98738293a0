//! The `lint` command: find statements evaluation would reject or never match.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Result;
use authority_config::AuthorityConfig;
use authority_policy::{Comparator, ComparatorMap, PolicyDocument, Statement, parse_policies};

use crate::style::{self, SemanticStyle};

/// One problem found in a policy file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub file: PathBuf,
    pub policy_id: Option<String>,
    pub statement: Option<usize>,
    pub problem: String,
}

/// Lints each file and prints the problems found.
///
/// Exit status is 1 when any problem is found.
pub fn run(config: &AuthorityConfig, policies: Vec<PathBuf>) -> Result<ExitCode> {
    let files = if policies.is_empty() {
        config.policy_files()?
    } else {
        policies
    };
    if files.is_empty() {
        style::print_warn("No policy files given or configured");
        return Ok(ExitCode::SUCCESS);
    }

    let issues: Vec<Issue> = files.iter().flat_map(|file| lint_file(file)).collect();

    if issues.is_empty() {
        style::print_success(&format!("{} file(s) checked, no problems found", files.len()));
        return Ok(ExitCode::SUCCESS);
    }

    let rows: Vec<Vec<String>> = issues
        .iter()
        .map(|issue| {
            vec![
                issue.file.display().to_string(),
                issue.policy_id.clone().unwrap_or_default(),
                issue.statement.map(|i| i.to_string()).unwrap_or_default(),
                issue.problem.clone(),
            ]
        })
        .collect();
    style::print_result_table(&["File", "Policy", "Statement", "Problem"], &rows);
    println!(
        "{}",
        format!("{} problem(s) in {} file(s)", issues.len(), files.len()).denied()
    );
    Ok(ExitCode::FAILURE)
}

/// Reads and lints one policy file.
pub fn lint_file(path: &Path) -> Vec<Issue> {
    let file_issue = |problem: String| Issue {
        file: path.to_path_buf(),
        policy_id: None,
        statement: None,
        problem,
    };

    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) => return vec![file_issue(format!("unreadable: {e}"))],
    };
    match parse_policies(&bytes) {
        Ok(documents) => documents
            .iter()
            .flat_map(lint_document)
            .map(|(policy_id, statement, problem)| Issue {
                file: path.to_path_buf(),
                policy_id: Some(policy_id),
                statement,
                problem,
            })
            .collect(),
        Err(e) => vec![file_issue(e.to_string())],
    }
}

/// Returns `(policy id, statement index, problem)` for each problem in a document.
pub fn lint_document(document: &PolicyDocument) -> Vec<(String, Option<usize>, String)> {
    let mut problems = Vec::new();
    let id = &document.policy_id;

    if document.statements.is_empty() {
        problems.push((id.clone(), None, "policy has no statements".to_string()));
    }
    for (index, statement) in document.statements.iter().enumerate() {
        for problem in lint_statement(statement) {
            problems.push((id.clone(), Some(index), problem));
        }
    }
    problems
}

fn lint_statement(statement: &Statement) -> Vec<String> {
    let mut problems = Vec::new();

    // An invalid effect fails every evaluation over this policy set.
    if let Err(e) = statement.effect() {
        problems.push(e.to_string());
    }
    if statement.resource.is_empty() {
        problems.push("statement has no resource".to_string());
    }
    if statement.actions.is_empty() {
        problems.push("statement has no actions and never applies".to_string());
    }

    if let Some(condition) = &statement.condition {
        for (group, comparators) in [
            ("AtLeastOne", &condition.at_least_one),
            ("MustHaveAll", &condition.must_have_all),
        ] {
            if let Some(comparators) = comparators {
                lint_group(group, comparators, &mut problems);
            }
        }
    }
    problems
}

fn lint_group(group: &str, comparators: &ComparatorMap, problems: &mut Vec<String>) {
    for (key, comparator) in comparators {
        if comparator.is_empty() {
            problems.push(format!("{group} comparator '{key}' has no predicates and always matches"));
        }
        if let Some(problem) = lint_validation_func(comparator) {
            problems.push(format!("{group} comparator '{key}': {problem}"));
        }
    }
}

fn lint_validation_func(comparator: &Comparator) -> Option<String> {
    let func = comparator.validation_func.as_ref()?;
    if func.function.is_empty() {
        return Some("ValidationFunc has no Function name".to_string());
    }
    let operands = [&func.string_arg, &func.prop_arg, &func.user_arg]
        .iter()
        .filter(|arg| arg.is_some())
        .count();
    match operands {
        1 => None,
        0 => Some(format!("ValidationFunc '{}' has no second operand", func.function)),
        _ => Some(format!(
            "ValidationFunc '{}' has more than one second operand",
            func.function
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use authority_policy::{Condition, ValidationFunc};
    use tempfile::tempdir;

    #[test]
    fn clean_document_has_no_problems() {
        let document = PolicyDocument::new("leave").with_statement(
            Statement::allow("res:::leave", ["act:::leave:create"]).with_condition(
                Condition::new().with_must_have_all(
                    "prop:::leave:owner",
                    Comparator::new().with_user_prop_equal("user:::uid"),
                ),
            ),
        );
        assert!(lint_document(&document).is_empty());
    }

    #[test]
    fn reports_statement_problems() {
        let document = PolicyDocument::new("broken")
            .with_statement(Statement::new("allow", "res:::leave", ["act:::leave:create"]))
            .with_statement(Statement::deny("", Vec::<String>::new()));

        let problems = lint_document(&document);
        assert_eq!(problems.len(), 3);
        assert!(problems.iter().all(|(id, _, _)| id == "broken"));
        assert_eq!(problems[0].1, Some(0));
        assert!(problems[0].2.contains("allow"));
        assert_eq!(problems[1].1, Some(1));
        assert_eq!(problems[2].1, Some(1));
    }

    #[test]
    fn reports_validation_func_operands() {
        let condition = Condition::new()
            .with_at_least_one(
                "prop:::leave:owner",
                Comparator::new().with_validation_func(ValidationFunc::new("same_team")),
            )
            .with_must_have_all(
                "prop:::leave:team",
                Comparator::new().with_validation_func(
                    ValidationFunc::new("same_team")
                        .with_string_arg("a")
                        .with_user_arg("user:::team"),
                ),
            );
        let document = PolicyDocument::new("p")
            .with_statement(Statement::allow("res:::leave", ["act:::leave:view"]).with_condition(condition));

        let problems = lint_document(&document);
        assert_eq!(problems.len(), 2);
        assert!(problems[0].2.contains("no second operand"));
        assert!(problems[1].2.contains("more than one"));
    }

    #[test]
    fn unparseable_file_is_one_issue() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("bad.json");
        fs::write(&path, "{ not json").unwrap();

        let issues = lint_file(&path);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].file, path);
        assert!(issues[0].policy_id.is_none());

        let missing = lint_file(&dir.path().join("missing.json"));
        assert_eq!(missing.len(), 1);
        assert!(missing[0].problem.starts_with("unreadable"));
    }
}
