//! The `examshield init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    write_if_missing(Path::new("examshield.toml"), SAMPLE_CONFIG)?;

    std::fs::create_dir_all("question-banks")?;
    write_if_missing(Path::new("question-banks/sample.toml"), SAMPLE_BANK)?;

    std::fs::create_dir_all("answers")?;
    write_if_missing(Path::new("answers/sample.toml"), SAMPLE_ANSWERS)?;

    println!("\nNext steps:");
    println!("  1. Run: examshield validate --bank question-banks/sample.toml");
    println!(
        "  2. Run: examshield take --bank question-banks/sample.toml --answers answers/sample.toml"
    );
    println!("  3. Edit examshield.toml to point at a remote grader");

    Ok(())
}

fn write_if_missing(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)?;
        println!("Created {}", path.display());
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# examshield configuration

weak_topic_threshold = 70.0
warning_ceiling = 3
tick_period_ms = 1000

[grader]
type = "placeholder"

# [grader]
# type = "remote"
# base_url = "https://grader.example.com"
# api_key = "${EXAMSHIELD_GRADER_KEY}"

[retry]
max_retries = 3
initial_delay_ms = 1000
"#;

const SAMPLE_BANK: &str = r#"[bank]
id = "sample"
subject = "Physics"
difficulty = "easy"

[[questions]]
id = "q1"
type = "mcq"
prompt = "The first law of thermodynamics is essentially a statement of:"
topic = "Thermodynamics"
marks = 2
time_limit_secs = 90
options = ["Conservation of momentum", "Conservation of energy", "Conservation of mass", "Conservation of charge"]
correct_option = 1

[[questions]]
id = "q2"
type = "mcq"
prompt = "Electric field inside a conductor in electrostatic equilibrium is:"
topic = "Electrostatics"
marks = 2
time_limit_secs = 90
options = ["Infinite", "Zero", "Equal to surface charge density", "Depends on material"]
correct_option = 1

[[questions]]
id = "q3"
type = "short"
prompt = "Explain the principle of superposition of waves."
topic = "Waves"
marks = 5
time_limit_secs = 300
reference_answer = "The resultant displacement equals the algebraic sum of the individual displacements."
"#;

const SAMPLE_ANSWERS: &str = r#"[[events]]
action = "select"
question = "q1"
option = 1

[[events]]
action = "select"
question = "q2"
option = 0

[[events]]
action = "text"
question = "q3"
text = "Displacements of overlapping waves add."

[[events]]
action = "submit"
"#;
