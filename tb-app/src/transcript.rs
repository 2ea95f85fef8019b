//! Human-readable run trace written to stdout (or any `Write` in tests).

use crate::stats::RunStats;
use crate::stream::AssembledResponse;
use std::io::{self, Write};
use std::time::Duration;
use tb_llm::ChatMessage;
use tb_tools::ToolOutput;

pub struct Transcript<W: Write> {
    out: W,
}

impl<W: Write> Transcript<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn model_response(&mut self, message: &ChatMessage) -> io::Result<()> {
        writeln!(self.out, "\n=== Model Response ===")?;
        if !message.content.is_empty() {
            writeln!(self.out, "{}", message.content)?;
        }
        for call in &message.tool_calls {
            writeln!(
                self.out,
                "tool_call id={} name={} arguments={}",
                call.id, call.name, call.arguments
            )?;
        }
        Ok(())
    }

    pub fn stream_started(&mut self) -> io::Result<()> {
        writeln!(self.out, "\n=== Model Response (streaming) ===")
    }

    pub fn stream_delta(&mut self, text: &str) -> io::Result<()> {
        write!(self.out, "{text}")?;
        self.out.flush()
    }

    pub fn stream_finished(&mut self, assembled: &AssembledResponse) -> io::Result<()> {
        if !assembled.text.is_empty() && !assembled.text.ends_with('\n') {
            writeln!(self.out)?;
        }
        writeln!(
            self.out,
            "streamed function call name: {}",
            assembled.tool_name.as_deref().unwrap_or("None")
        )?;
        writeln!(
            self.out,
            "streamed function call arguments: {}",
            assembled.arguments
        )
    }

    pub fn no_stream_arguments(&mut self) -> io::Result<()> {
        writeln!(
            self.out,
            "[Warning] No arguments collected from stream, treating the text as the final answer"
        )
    }

    pub fn tool_call(&mut self, name: &str, arguments: &serde_json::Value) -> io::Result<()> {
        writeln!(self.out, "\n[Tool Call] {name}({arguments})")
    }

    pub fn tool_result(&mut self, output: &ToolOutput, elapsed: Duration) -> io::Result<()> {
        let label = if output.is_failure() {
            "[Tool Failure]"
        } else {
            "[Tool Result]"
        };
        writeln!(
            self.out,
            "{label} {}  (time: {:.6} s)",
            output.text(),
            elapsed.as_secs_f64()
        )
    }

    pub fn unknown_tool(&mut self, name: &str) -> io::Result<()> {
        writeln!(self.out, "[Error] Unknown tool: {name}")
    }

    pub fn malformed_arguments(&mut self, error: &str, raw: &str) -> io::Result<()> {
        writeln!(self.out, "[Error] JSONDecodeError: {error}")?;
        writeln!(self.out, "Raw arguments: {raw}")
    }

    pub fn round_limit(&mut self, rounds: usize) -> io::Result<()> {
        writeln!(
            self.out,
            "[Error] Stopped after {rounds} completion requests without a final answer"
        )
    }

    pub fn final_answer(&mut self, answer: &str) -> io::Result<()> {
        writeln!(self.out, "\n=== Final Answer ===")?;
        writeln!(self.out, "{answer}")
    }

    pub fn breakdown(&mut self, stats: &RunStats) -> io::Result<()> {
        writeln!(self.out, "\n{stats}")?;
        self.out.flush()
    }
}
