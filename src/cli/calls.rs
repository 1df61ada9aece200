//! `vocalis calls` — inspect archived call history.

use anyhow::Result;

use crate::db::{self, calls::CallRepository};

use super::args::CallsCliArgs;

pub fn handle_calls_command(args: CallsCliArgs) -> Result<()> {
    let conn = db::init_db()?;

    if let Some(id) = args.id {
        match CallRepository::get(&conn, id)? {
            Some(call) => {
                println!("Call #{} ({})", call.id, call.call_id);
                println!("  status:   {}", call.status);
                println!("  started:  {}", call.started_at);
                if let Some(ended) = &call.ended_at {
                    println!("  ended:    {}", ended);
                }
                if let Some(turns) = call.turn_count {
                    println!("  turns:    {}", turns);
                }
                if let Some(summary) = &call.summary {
                    println!("\nSummary:\n{}", summary);
                }
                if let Some(transcript) = &call.transcript_text {
                    println!("\nTranscript:\n{}", transcript);
                }
            }
            None => println!("No call with id {}", id),
        }
        return Ok(());
    }

    let calls = CallRepository::list(&conn, args.limit)?;
    if calls.is_empty() {
        println!("No archived calls yet.");
        return Ok(());
    }

    for call in calls {
        let summary = call
            .summary
            .as_deref()
            .map(|s| truncate(s, 60))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "#{:<5} {:<20} {:<10} {:<20} {}",
            call.id, call.call_id, call.status, call.started_at, summary
        );
    }

    Ok(())
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max_chars).collect();
        format!("{}…", cut.trim_end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_short_string() {
        assert_eq!(truncate("hello", 10), "hello");
    }

    #[test]
    fn test_truncate_long_string() {
        let out = truncate("a very long summary about the call", 10);
        assert!(out.ends_with('…'));
        assert!(out.chars().count() <= 11);
    }
}
