//! Console output formatting

use crate::evidence::{Finding, FindingStatus, Observation};

const GREEN: &str = "\x1b[32m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Print evidence in a human-readable format
pub fn print_results(observations: &[Observation], findings: &[Finding]) {
    if observations.is_empty() {
        println!("No observations were produced.");
        return;
    }

    println!();
    println!("╔═══════════════════════════════════════════════════════════════════════════════╗");
    println!("║                            SSH COMPLIANCE RESULTS                             ║");
    println!("╚═══════════════════════════════════════════════════════════════════════════════╝");
    println!();

    let total = observations.len();
    let mut failed = 0;
    for (index, observation) in observations.iter().enumerate() {
        let related: Vec<&Finding> = findings
            .iter()
            .filter(|f| f.related_observations.contains(&observation.id))
            .collect();
        if related
            .iter()
            .any(|f| f.status == FindingStatus::NotSatisfied)
        {
            failed += 1;
        }
        print_observation(index + 1, total, observation, &related);
    }

    print_summary(total, failed, violation_count(findings));
}

fn print_observation(num: usize, total: usize, observation: &Observation, findings: &[&Finding]) {
    let policy = observation
        .labels
        .get("_policy")
        .map(String::as_str)
        .unwrap_or("unknown policy");
    let passed = findings
        .iter()
        .all(|f| f.status == FindingStatus::Satisfied);
    let (icon, color) = if passed { ("✓", GREEN) } else { ("✗", RED) };

    println!("[{}/{}] {}{}{} {}", num, total, color, icon, RESET, policy);
    println!("       {}", observation.title);
    if !passed {
        for finding in findings {
            println!("       └─ {}", finding.title);
        }
    }
}

/// Findings that record a violation; satisfied findings are not counted
fn violation_count(findings: &[Finding]) -> usize {
    findings
        .iter()
        .filter(|f| f.status == FindingStatus::NotSatisfied)
        .count()
}

fn print_summary(total: usize, failed: usize, violations: usize) {
    println!();
    println!("╔═══════════════════════════════════════════════════════════════════════════════╗");
    println!("║                                 SUMMARY                                       ║");
    println!("╠═══════════════════════════════════════════════════════════════════════════════╣");
    println!(
        "║   Policies evaluated: {:3}                                                     ║",
        total
    );
    println!(
        "║   {}Passed:{}             {:3}                                                     ║",
        GREEN,
        RESET,
        total - failed
    );
    println!(
        "║   {}Failed:{}             {:3}                                                     ║",
        RED, RESET, failed
    );
    println!(
        "║   Violations:         {:3}                                                     ║",
        violations
    );
    println!("╚═══════════════════════════════════════════════════════════════════════════════╝");
    println!();
}
