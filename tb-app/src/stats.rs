use std::fmt;
use std::time::Duration;
use tb_llm::Usage;

/// Per-run counters. Owned by the driver and handed to each step by `&mut`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStats {
    pub inference_time: Duration,
    pub tool_time: Duration,
    pub total_tokens: u64,
    /// Completion tokens of turns that requested tools.
    pub tool_call_tokens: u64,
    pub requests: usize,
    pub tool_calls: usize,
    pub failed_tool_calls: usize,
}

impl RunStats {
    pub fn record_inference(&mut self, elapsed: Duration) {
        self.inference_time += elapsed;
        self.requests += 1;
    }

    pub fn record_usage(&mut self, usage: Usage, requested_tools: bool) {
        self.total_tokens += u64::from(usage.total_tokens);
        if requested_tools {
            self.tool_call_tokens += u64::from(usage.completion_tokens);
        }
    }

    pub fn record_tool_call(&mut self, elapsed: Duration, failed: bool) {
        self.tool_time += elapsed;
        self.tool_calls += 1;
        if failed {
            self.failed_tool_calls += 1;
        }
    }

    pub fn total_time(&self) -> Duration {
        self.inference_time + self.tool_time
    }

    /// Share of all tokens spent on tool-call turns, in `[0, 1]`; 0 when nothing was counted.
    pub fn tool_token_ratio(&self) -> f64 {
        if self.total_tokens == 0 {
            return 0.0;
        }
        (self.tool_call_tokens as f64 / self.total_tokens as f64).clamp(0.0, 1.0)
    }
}

impl fmt::Display for RunStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Final Breakdown ===")?;
        writeln!(f, "Total time: {:.3} s", self.total_time().as_secs_f64())?;
        writeln!(
            f,
            "  - LLM inference time: {:.3} s",
            self.inference_time.as_secs_f64()
        )?;
        writeln!(
            f,
            "  - Function call time: {:.3} s",
            self.tool_time.as_secs_f64()
        )?;
        writeln!(f, "Completion requests: {}", self.requests)?;
        writeln!(
            f,
            "Tool calls: {} ({} failed)",
            self.tool_calls, self.failed_tool_calls
        )?;
        writeln!(f, "Total tokens: {}", self.total_tokens)?;
        writeln!(f, "Function call tokens: {}", self.tool_call_tokens)?;
        write!(
            f,
            "Function call token ratio: {:.2}%",
            self.tool_token_ratio() * 100.0
        )
    }
}
