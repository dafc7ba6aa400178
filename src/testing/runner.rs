//! Flow runner implementation
//!
//! Executes flow files against a [`RunContext`], asserting on structured
//! response data and chaining values between steps through the test-data
//! store.

use std::path::Path;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use colored::Colorize;
use reqwest::Method;

use crate::assertions;
use crate::client::RequestOptions;
use crate::common::{Error, Result};
use crate::context::RunContext;

use super::config::{FlowFile, RequestStep, ResetData, TestCase, TestStep};
use super::report::{RunReport, TestResult, TestStatus};
use super::select::{resolve_targets, test_matches, Selection};
use super::template::{render_str, render_value, value_text, TemplateScope};

/// Options for a run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Only run tests carrying one of these markers
    pub markers: Vec<String>,
    /// Print response bodies and step details
    pub verbose: bool,
}

/// Load a flow file
pub fn load_flow(path: &Path) -> Result<FlowFile> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read flow file '{}': {}", path.display(), e))
    })?;

    serde_yaml::from_str(&content).map_err(|e| {
        Error::Config(format!(
            "Failed to parse flow file '{}': {}",
            path.display(),
            e
        ))
    })
}

/// Run every selected test
///
/// Only target resolution errors are returned as `Err`; test failures, and
/// configuration/login failures that abort the run, are recorded in the
/// report.
pub async fn run_targets(
    ctx: &mut RunContext,
    targets: &[String],
    options: &RunOptions,
) -> Result<RunReport> {
    let selections = resolve_targets(targets)?;
    let started = Instant::now();
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let mut report = RunReport::default();

    for selection in &selections {
        run_flow(ctx, selection, options, timestamp, &mut report).await;
        if report.aborted.is_some() {
            break;
        }
    }

    report.duration_ms = started.elapsed().as_millis() as u64;
    print_summary(&report);

    Ok(report)
}

/// Run the selected tests of one flow file
async fn run_flow(
    ctx: &mut RunContext,
    selection: &Selection,
    options: &RunOptions,
    timestamp: u64,
    report: &mut RunReport,
) {
    let file = selection.file.display().to_string();

    let flow = match load_flow(&selection.file) {
        Ok(flow) => flow,
        Err(e) => {
            println!("\n{} {}", "✗".red(), e);
            report.push(TestResult {
                file: file.clone(),
                id: "<load>".to_string(),
                name: file,
                status: TestStatus::Failed,
                steps_run: 0,
                steps_total: 0,
                error: Some(e.to_string()),
                duration_ms: 0,
            });
            return;
        }
    };

    let selected: Vec<&TestCase> = flow
        .tests
        .iter()
        .filter(|t| test_matches(&flow, t, selection.test_id.as_deref(), &options.markers))
        .collect();

    if selected.is_empty() {
        if let Some(id) = &selection.test_id {
            let error = format!("No test with id '{}' in {}", id, file);
            println!("\n{} {}", "✗".red(), error);
            report.push(TestResult {
                file: file.clone(),
                id: id.clone(),
                name: id.clone(),
                status: TestStatus::Failed,
                steps_run: 0,
                steps_total: 0,
                error: Some(error),
                duration_ms: 0,
            });
        }
        return;
    }

    println!(
        "\n{} {} {}",
        "Running Flow:".blue().bold(),
        flow.name.white().bold(),
        format!("({})", file).dimmed()
    );
    if let Some(desc) = &flow.description {
        println!("  {}", desc.dimmed());
    }

    if let Err(e) = apply_reset(ctx, flow.reset_data.as_ref()) {
        tracing::error!(file = %file, error = %e, "Failed to reset test data");
        println!("  {} reset_data: {}", "✗".red(), e);
        if e.is_fatal() {
            report.aborted = Some(e.to_string());
        }
        report.push(TestResult {
            file: file.clone(),
            id: "<reset>".to_string(),
            name: flow.name.clone(),
            status: TestStatus::Failed,
            steps_run: 0,
            steps_total: 0,
            error: Some(e.to_string()),
            duration_ms: 0,
        });
        return;
    }

    let mut blocked: Option<String> = None;

    for test in selected {
        if let Some(reason) = &blocked {
            println!(
                "  {} {} {}",
                "-".yellow(),
                test.display_name(),
                "(skipped)".dimmed()
            );
            report.push(TestResult {
                file: file.clone(),
                id: test.id.clone(),
                name: test.display_name().to_string(),
                status: TestStatus::Skipped,
                steps_run: 0,
                steps_total: test.steps.len(),
                error: Some(reason.clone()),
                duration_ms: 0,
            });
            continue;
        }

        println!("\n  {} {}", "Test:".cyan(), test.display_name().white());

        let started = Instant::now();
        let (steps_run, outcome) = run_test(ctx, test, timestamp, options.verbose).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        let (status, error) = match outcome {
            Ok(()) => {
                println!("  {} {}", "✓".green().bold(), "Passed".green());
                (TestStatus::Passed, None)
            }
            Err(e) => {
                println!("  {} {}", "✗".red().bold(), "Failed".red());
                if e.is_fatal() {
                    tracing::error!(error = %e, "Aborting run");
                    report.aborted = Some(e.to_string());
                    blocked = Some(format!("run aborted: {}", e));
                } else {
                    blocked = Some(format!("earlier test '{}' failed", test.id));
                }
                (TestStatus::Failed, Some(e.to_string()))
            }
        };

        report.push(TestResult {
            file: file.clone(),
            id: test.id.clone(),
            name: test.display_name().to_string(),
            status,
            steps_run,
            steps_total: test.steps.len(),
            error,
            duration_ms,
        });
    }
}

fn apply_reset(ctx: &mut RunContext, reset: Option<&ResetData>) -> Result<()> {
    match reset {
        None | Some(ResetData::All(false)) => Ok(()),
        Some(ResetData::All(true)) => ctx.data_mut().reset(None),
        Some(ResetData::Scopes(scopes)) => {
            for scope in scopes {
                ctx.data_mut().reset(Some(scope))?;
            }
            Ok(())
        }
    }
}

/// Run one test; returns the number of steps attempted and the outcome
async fn run_test(
    ctx: &mut RunContext,
    test: &TestCase,
    timestamp: u64,
    verbose: bool,
) -> (usize, Result<()>) {
    for (i, step) in test.steps.iter().enumerate() {
        let step_num = i + 1;
        if let Err(e) = execute_step(ctx, step, step_num, timestamp, verbose).await {
            println!("    {} Step {}: {}", "✗".red(), step_num, e);
            return (step_num, Err(e));
        }
    }
    (test.steps.len(), Ok(()))
}

/// Execute a single test step
async fn execute_step(
    ctx: &mut RunContext,
    step: &TestStep,
    step_num: usize,
    timestamp: u64,
    verbose: bool,
) -> Result<()> {
    match step {
        TestStep::Request(request) => {
            execute_request_step(ctx, request, step_num, timestamp, verbose).await
        }
        TestStep::SetData { path, value } => {
            let value = {
                let scope = template_scope(ctx, timestamp);
                render_value(value, &scope)?
            };
            ctx.data_mut().set(path, serde_yaml::to_value(&value)?)?;
            println!(
                "    {} Step {}: set {} = {}",
                "✓".green(),
                step_num,
                path.dimmed(),
                value_text(&value).dimmed()
            );
            Ok(())
        }
        TestStep::ResetData { scope } => {
            ctx.data_mut().reset(scope.as_deref())?;
            println!(
                "    {} Step {}: reset {}",
                "✓".green(),
                step_num,
                scope.as_deref().unwrap_or("all test data").dimmed()
            );
            Ok(())
        }
        TestStep::Login { force } => {
            ctx.get_token(*force).await?;
            println!(
                "    {} Step {}: login{}",
                "✓".green(),
                step_num,
                if *force { " (forced)" } else { "" }
            );
            Ok(())
        }
    }
}

fn template_scope(ctx: &RunContext, timestamp: u64) -> TemplateScope<'_> {
    TemplateScope {
        data: ctx.data().document(),
        config: ctx.config(),
        timestamp,
    }
}

/// Execute a request step
async fn execute_request_step(
    ctx: &mut RunContext,
    step: &RequestStep,
    step_num: usize,
    timestamp: u64,
    verbose: bool,
) -> Result<()> {
    let method = Method::from_bytes(step.method.to_uppercase().as_bytes())
        .map_err(|_| Error::Template(format!("Invalid HTTP method '{}'", step.method)))?;

    let (endpoint, options) = {
        let scope = template_scope(ctx, timestamp);
        let endpoint = render_str(&step.endpoint, &scope)?;

        let mut options = RequestOptions::new();
        for (key, value) in &step.query {
            options = options.query(key.as_str(), value_text(&render_value(value, &scope)?));
        }
        for (name, value) in &step.headers {
            options = options.header(name.as_str(), value_text(&render_value(value, &scope)?));
        }
        if let Some(body) = &step.json {
            options = options.json(render_value(body, &scope)?);
        }
        if !step.auth {
            options = options.without_auth();
        }
        (endpoint, options)
    };

    let expect = step.expect.as_ref();
    let expected_status = expect.and_then(|e| e.status);
    let expected_biz = expect.and_then(|e| e.biz_code.clone());
    let code_field = ctx.settings().response.code_field.clone();

    let response = {
        let mut client = ctx.client();
        match (expected_status, expected_biz) {
            (Some(status), Some(biz)) => {
                client
                    .request_with_assert(method.clone(), &endpoint, status, biz, options)
                    .await?
            }
            (status, biz) => {
                let options = if status.is_some() {
                    options.allow_error_status()
                } else {
                    options
                };
                let response = client.request(method.clone(), &endpoint, options).await?;
                if let Some(status) = status {
                    assertions::assert_status(method.as_str(), &endpoint, status, response.status)?;
                }
                if let Some(biz) = biz {
                    assertions::assert_biz_code(
                        method.as_str(),
                        &endpoint,
                        &code_field,
                        &biz,
                        &response.body,
                    )?;
                }
                response
            }
        }
    };

    if let Some(expect) = expect {
        for field in &expect.fields {
            for check in field.checks() {
                assertions::assert_field(
                    method.as_str(),
                    &endpoint,
                    &response.body,
                    &field.path,
                    &check,
                )?;
            }
        }
    }

    for (data_path, response_path) in &step.save {
        let value = response.field(response_path).ok_or_else(|| {
            Error::TestAssertion(format!(
                "{} {}: cannot save '{}': response has no field '{}'",
                method, endpoint, data_path, response_path
            ))
        })?;
        ctx.data_mut().set(data_path, serde_yaml::to_value(value)?)?;
    }

    println!(
        "    {} Step {}: {} {} {}",
        "✓".green(),
        step_num,
        method.as_str(),
        endpoint.dimmed(),
        format!("({} in {} ms)", response.status, response.elapsed.as_millis()).dimmed()
    );

    if verbose {
        println!("      {}", response.body_excerpt().dimmed());
        for data_path in step.save.keys() {
            println!("      saved {}", data_path.dimmed());
        }
    }

    Ok(())
}

fn print_summary(report: &RunReport) {
    println!();
    if let Some(reason) = &report.aborted {
        println!("{} {}", "Run aborted:".red().bold(), reason);
    }

    let line = format!(
        "{} passed, {} failed, {} skipped ({} total) in {} ms",
        report.passed, report.failed, report.skipped, report.total, report.duration_ms
    );
    if report.success() {
        println!("{} {}", "✓".green().bold(), line.green());
    } else {
        println!("{} {}", "✗".red().bold(), line.red());
        for test in report.tests.iter().filter(|t| t.status == TestStatus::Failed) {
            println!(
                "  {} {}::{}: {}",
                "✗".red(),
                test.file,
                test.id,
                test.error.as_deref().unwrap_or("")
            );
        }
    }
    println!();
}
