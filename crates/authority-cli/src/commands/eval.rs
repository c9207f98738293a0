//! The `eval` command: decide one access request.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use authority_config::AuthorityConfig;
use authority_policy::{
    Decision, EmptySubject, EvaluationContext, JsonSubject, PolicyDocument, ResourceRequest,
    SubjectAttributeResolver, decide, load_policies,
};
use tracing::warn;

use crate::style::{self, SemanticStyle};

use super::token::token_service;

/// Exit code for a request that could not be evaluated.
const EVALUATION_FAILED: u8 = 2;

/// Arguments of `authority eval`.
pub struct EvalOptions {
    pub policies: Vec<PathBuf>,
    pub resource: String,
    pub action: String,
    pub strings: Vec<(String, String)>,
    pub integers: Vec<(String, i64)>,
    pub floats: Vec<(String, f64)>,
    pub booleans: Vec<(String, bool)>,
    pub subject: Option<PathBuf>,
    pub token: Option<String>,
    pub explain: bool,
}

impl EvalOptions {
    fn request(&self) -> ResourceRequest {
        let mut builder = ResourceRequest::builder()
            .resource(&self.resource)
            .action(&self.action);
        for (key, value) in &self.strings {
            builder = builder.string(key, value);
        }
        for (key, value) in &self.integers {
            builder = builder.integer(key, *value);
        }
        for (key, value) in &self.floats {
            builder = builder.float(key, *value);
        }
        for (key, value) in &self.booleans {
            builder = builder.boolean(key, *value);
        }
        builder.build()
    }
}

/// Evaluates the request and prints `ALLOWED` or `DENIED`.
///
/// Exit status is 0 when allowed, 1 when denied and 2 when evaluation failed.
/// Unreadable policy files, unreadable subject files and rejected tokens fail
/// the evaluation rather than the command, so the output is still a denial.
pub fn run(config: &AuthorityConfig, options: EvalOptions) -> ExitCode {
    let policies = load_request_policies(config, &options);
    let subject = load_subject(config, &options);
    let context = match (policies, subject) {
        (Ok(policies), Ok(subject)) => EvaluationContext::new()
            .with_policies(policies)
            .with_shared_subject(subject),
        (Err(e), _) | (Ok(_), Err(e)) => EvaluationContext::new().with_error(format!("{e:#}")),
    };

    let request = options.request();
    match decide(&context, &request) {
        Ok(decision) => {
            print_decision(&decision, options.explain);
            if decision.effect.is_allowed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            println!("{}", "DENIED".denied());
            style::print_error(&format!("evaluation failed: {e}"));
            ExitCode::from(EVALUATION_FAILED)
        }
    }
}

fn load_request_policies(
    config: &AuthorityConfig,
    options: &EvalOptions,
) -> Result<Vec<PolicyDocument>> {
    let files = if options.policies.is_empty() {
        config.policy_files()?
    } else {
        options.policies.clone()
    };
    if files.is_empty() {
        warn!("No policy files given or configured");
    }
    Ok(load_policies(&files)?)
}

/// Resolves the subject from `--token`, `--subject` or nothing.
fn load_subject(
    config: &AuthorityConfig,
    options: &EvalOptions,
) -> Result<Arc<dyn SubjectAttributeResolver>> {
    let prefix = &config.subject.key_prefix;
    let separator = &config.subject.separator;

    if let Some(token) = &options.token {
        let claims = token_service(config)?
            .verify(token)
            .context("token rejected")?;
        return Ok(Arc::new(claims.to_subject(prefix, separator)));
    }
    if let Some(path) = &options.subject {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read subject file {}", path.display()))?;
        return Ok(Arc::new(
            JsonSubject::from_json(&text)
                .with_key_prefix(prefix)
                .with_separator(separator),
        ));
    }
    Ok(Arc::new(EmptySubject))
}

fn print_decision(decision: &Decision, explain: bool) {
    let label = decision.effect.as_str();
    if decision.effect.is_allowed() {
        println!("{}", label.allowed());
    } else {
        println!("{}", label.denied());
    }

    if !explain {
        return;
    }

    if !decision.matched.is_empty() {
        let rows: Vec<Vec<String>> = decision
            .matched
            .iter()
            .map(|s| {
                vec![
                    s.policy_id.clone(),
                    s.index.to_string(),
                    s.effect.to_string(),
                ]
            })
            .collect();
        style::print_result_table(&["Policy", "Statement", "Effect"], &rows);
    }
    style::print_labeled("Reason", &decision.reason);
}
