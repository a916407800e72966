use std::fmt::Write;

use chrono::{DateTime, Utc};
use prettytable::{
    format::{LinePosition, LineSeparator, TableFormat},
    row,
    Cell,
    Row,
    Table,
};
use talent_engine::{
    db_types::{Job, Payment},
    MatchSupply,
    Ranking,
    SkillFrequency,
};

fn markdown_format() -> TableFormat {
    prettytable::format::FormatBuilder::new()
        .column_separator('|')
        .borders('|')
        .separator(LinePosition::Title, LineSeparator::new('-', '|', '|', '|'))
        .padding(1, 1)
        .build()
}

fn markdown_style(table: &mut Table) {
    table.set_format(markdown_format());
}

fn timestamp(t: &DateTime<Utc>) -> String {
    t.format("%Y-%m-%d %H:%M:%S").to_string()
}

pub fn format_payment(payment: &Payment) -> String {
    format_payments(std::slice::from_ref(payment))
}

pub fn format_payments(payments: &[Payment]) -> String {
    let mut table = Table::new();
    table.set_titles(row!["ID", "TX ref", "Amount", "Purpose", "Payer", "Spent on", "Created At"]);
    payments.iter().for_each(|payment| {
        table.add_row(payment_to_row(payment));
    });
    markdown_style(&mut table);
    table.to_string()
}

pub fn payment_to_row(payment: &Payment) -> Row {
    let payer = payment.payer.as_ref().map(|p| p.to_string()).unwrap_or_default();
    let spent_on = match (&payment.consumed_by, payment.consumed) {
        (Some(action), _) => action.to_string(),
        (None, true) => "yes".to_string(),
        (None, false) => String::default(),
    };
    Row::new(vec![
        Cell::new(&payment.id.to_string()),
        Cell::new(payment.tx_ref.as_str()),
        Cell::new(&payment.amount.to_string()),
        Cell::new(&payment.purpose.to_string()),
        Cell::new(&payer),
        Cell::new(&spent_on),
        Cell::new(&timestamp(&payment.created_at)),
    ])
}

pub fn format_job(job: &Job) -> String {
    let mut f = String::new();
    // Writing to a String cannot fail
    let _ = writeln!(f, "Job #{}: {}", job.id, job.title);
    let _ = writeln!(f, "Recruiter: {}", job.recruiter_id);
    let _ = writeln!(f, "Paid with payment #{}", job.payment_id);
    let _ = writeln!(f, "Skills: {}", job.skills.join(", "));
    if let Some(location) = &job.location {
        let _ = writeln!(f, "Location: {location}");
    }
    let _ = writeln!(f, "Applications: {}", job.candidates.len());
    let _ = write!(f, "Created at {}", timestamp(&job.created_at));
    f
}

pub fn format_ranking(ranking: &Ranking) -> String {
    let mut f = String::new();
    let _ = writeln!(f, "===============================================================================");
    let _ = writeln!(f, "Job #{}: {}. {} ranked candidates", ranking.job_id, ranking.job_title, ranking.results.len());
    let _ = writeln!(f, "===============================================================================");
    if ranking.is_empty() {
        f.push_str("No candidates matched this job.");
        return f;
    }
    let mut table = Table::new();
    table.set_titles(row!["#", "Candidate", "Name", "Score", "Skill overlap", "Premium", "Cached"]);
    for (i, candidate) in ranking.results.iter().enumerate() {
        table.add_row(row![
            (i + 1).to_string(),
            candidate.candidate_id.as_str(),
            candidate.name,
            format!("{:.1}", candidate.score),
            format!("{:.1}%", candidate.skill_overlap),
            if candidate.is_premium { "★" } else { "" },
            if candidate.from_cache { "yes" } else { "no" },
        ]);
    }
    markdown_style(&mut table);
    f.push_str(&table.to_string());
    f
}

pub fn format_supply(supply: &[MatchSupply], threshold: f64) -> String {
    let mut table = Table::new();
    table.set_titles(row!["Job", "Title", format!("Candidates scoring {threshold} or more")]);
    for s in supply {
        table.add_row(row![s.job_id.to_string(), s.job_title, s.matches.to_string()]);
    }
    markdown_style(&mut table);
    table.to_string()
}

pub fn format_skills(skills: &[SkillFrequency]) -> String {
    if skills.is_empty() {
        return "No job seeker lists any skills.".to_string();
    }
    let mut table = Table::new();
    table.set_titles(row!["#", "Skill", "Job seekers"]);
    for (i, s) in skills.iter().enumerate() {
        table.add_row(row![(i + 1).to_string(), s.skill, s.count.to_string()]);
    }
    markdown_style(&mut table);
    table.to_string()
}

#[cfg(test)]
mod test {
    use talent_engine::db_types::JobId;

    use super::*;

    #[test]
    fn empty_rankings_say_so() {
        let ranking = Ranking { job_id: JobId::from(3), job_title: "Rust developer".into(), results: vec![] };
        let text = format_ranking(&ranking);
        assert!(text.contains("Job #3: Rust developer. 0 ranked candidates"));
        assert!(text.contains("No candidates matched this job."));
    }

    #[test]
    fn supply_table_lists_every_job() {
        let supply = vec![
            MatchSupply { job_id: JobId::from(2), job_title: "Backend".into(), matches: 4 },
            MatchSupply { job_id: JobId::from(1), job_title: "Frontend".into(), matches: 0 },
        ];
        let text = format_supply(&supply, 50.0);
        assert!(text.contains("Candidates scoring 50 or more"));
        assert!(text.contains("Backend"));
        assert!(text.contains("Frontend"));
    }

    #[test]
    fn skills_are_listed_in_order() {
        let skills = vec![
            SkillFrequency { skill: "Rust".into(), count: 3 },
            SkillFrequency { skill: "Spring Boot".into(), count: 2 },
        ];
        let text = format_skills(&skills);
        let rust = text.find("| 1 | Rust").expect("Rust is listed first");
        let spring = text.find("| 2 | Spring Boot").expect("Spring Boot is listed second");
        assert!(rust < spring);
        assert_eq!(format_skills(&[]), "No job seeker lists any skills.");
    }
}
