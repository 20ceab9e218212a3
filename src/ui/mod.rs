use std::fmt::{Display, Formatter};

use std::io::Write;
use std::time::Instant;

use std::io::BufWriter;
use std::sync::mpsc::{channel, Sender};
use std::thread::ThreadId;

use console::{pad_str, pad_str_with, style, Alignment};

/// Struct to hold the UI
/// Particulary the receiver channel
pub struct UI {
    sender: UISender,
}

#[derive(Clone)]
pub struct UISender {
    sender: Sender<UIMessage>,
}

// needed in stable rust, unstable auto detects
unsafe impl Send for UISender {}
unsafe impl Sync for UISender {}

impl UISender {
    /// Send typed UIMessage to internal channel.
    /// Messages after the printer has exited are dropped, not an error.
    pub fn send(&self, user_msg: UIUserMessage) {
        #[cfg(not(feature = "disable_ui"))]
        let _ = self.sender.send(UIMessage {
            thread_id: std::thread::current().id(),
            message: user_msg,
        });
    }
}

impl Default for UI {
    fn default() -> Self {
        Self::new()
    }
}

impl UI {
    pub fn get_sender(&self) -> UISender {
        self.sender.clone()
    }

    pub fn new() -> Self {
        let (sender, receiver) = channel();

        #[cfg(not(feature = "disable_ui"))]
        std::thread::spawn(move || {
            #[cfg(not(feature = "locked_out"))]
            let stdout = std::io::stdout();
            #[cfg(feature = "locked_out")]
            let stdout = std::io::stdout().lock();

            #[cfg(not(feature = "buffered_out"))]
            let mut buffered_out = stdout;
            #[cfg(feature = "buffered_out")]
            let mut buffered_out = BufWriter::with_capacity(512, stdout);

            let start_time = Instant::now();

            let mut total_pricing_runtime = 0.0;
            let mut total_lp_runtime = 0.0;

            let mut num_lp_iterations = 0u32;
            let mut num_pricing_calls = 0u32;
            let mut num_evicted = 0usize;

            loop {
                let Ok(UIMessage { thread_id, message }) = receiver.recv() else {
                    break;
                };
                match message {
                    UIUserMessage::TimeLimitReached => {
                        writeln!(&mut buffered_out, "{}", style("Time Limit Reached").yellow().bold()).unwrap()
                    }
                    UIUserMessage::Log(msg) => {
                        writeln!(&mut buffered_out, "[{:?}] {:>6.2}  {}", thread_id, start_time.elapsed().as_secs_f64(), msg).unwrap()
                    }
                    UIUserMessage::LogS(msg) => {
                        writeln!(&mut buffered_out, "[{:?}] {:>6.2}  {}", thread_id, start_time.elapsed().as_secs_f64(), msg).unwrap()
                    }
                    UIUserMessage::StartExplore { num_k, budget_secs } => {
                        writeln!(&mut buffered_out, "{}", pad_str_with(&format!("{:?}", thread_id), 30, Alignment::Center, None, '⎯')).unwrap();
                        writeln!(&mut buffered_out, "{}", style(pad_str(&format!("Exploring {} aisle counts in {:.1}s", num_k, budget_secs), 30, Alignment::Center, None)).green()).unwrap();
                        writeln!(&mut buffered_out, "{}", "⎯".repeat(30)).unwrap();
                        buffered_out.flush().unwrap();
                    }
                    UIUserMessage::StartK { k, budget_secs, num_seeds } => {
                        writeln!(&mut buffered_out, "[{t:?}] {time:>6.2} started   k=<{k}> budget=<{budget_secs:>5.2}s> seeds=<{num_seeds}>",
                            t = thread_id,
                            time = start_time.elapsed().as_secs_f64(),
                        ).unwrap();
                        buffered_out.flush().unwrap();
                    }
                    UIUserMessage::LpIterationFinish(state) => {
                        total_lp_runtime += state.lp_runtime;
                        num_lp_iterations += 1;

                        writeln!(&mut buffered_out, "{}", style(format!("[{t:?}] {time:>6.2} lp iteration {state}",
                            t = thread_id,
                            time = start_time.elapsed().as_secs_f64(),
                            state = state
                        )).dim()).unwrap()
                    }
                    UIUserMessage::PricingFinish(state) => {
                        // always needed for statistics
                        total_pricing_runtime += state.runtime;
                        num_pricing_calls += 1;

                        /* noisy*/
                        writeln!(&mut buffered_out, "{}", style(format!("[{t:?}] {time:>6.2} pricing iteration {state}",
                            t = thread_id,
                            time = start_time.elapsed().as_secs_f64(),
                            state = state
                        )).dim()).unwrap();
                    }
                    UIUserMessage::Evicted { k, count } => {
                        num_evicted += count;
                        writeln!(&mut buffered_out, "{}", style(format!("[{t:?}] {time:>6.2} evicted {count} stale columns at k=<{k}>",
                            t = thread_id,
                            time = start_time.elapsed().as_secs_f64(),
                        )).dim()).unwrap();
                    }
                    UIUserMessage::DualSignFlip { k } => {
                        writeln!(&mut buffered_out, "[{:?}] {:>6.2}  {} k=<{}>", thread_id, start_time.elapsed().as_secs_f64(), style("flipped dual signs at").yellow(), k).unwrap();
                    }
                    UIUserMessage::NewBest { obj, k } => {
                        writeln!(&mut buffered_out, "[{:?}] {:>6.2}  {} {} (k=<{}>)", thread_id, start_time.elapsed().as_secs_f64(), style("Has new best:").black().on_green().bold(), style(obj.to_string()).bold(), k).unwrap();
                        buffered_out.flush().unwrap();
                    }
                    UIUserMessage::CommitStart { k } => {
                        writeln!(&mut buffered_out, "{}", style(pad_str(&format!("Committing wave with {} aisles", k), 30, Alignment::Center, None)).green()).unwrap();
                        buffered_out.flush().unwrap();
                    }
                    UIUserMessage::ExitUi => {
                        writeln!(&mut buffered_out, "{}", pad_str_with("Statistics", 30, Alignment::Center, None, '⎯')).unwrap();
                        writeln!(&mut buffered_out, "total_lp_time: {:>8.2}s ({} solves) / total_pricing_time: {:>8.2}s ({} calls)", total_lp_runtime, num_lp_iterations, total_pricing_runtime, num_pricing_calls).unwrap();
                        writeln!(&mut buffered_out, "columns evicted: {}", num_evicted).unwrap();
                        if total_lp_runtime + total_pricing_runtime > 0.0 {
                            writeln!(&mut buffered_out, "{:>3.1}% spent in pricing vs lp", total_pricing_runtime / (total_lp_runtime + total_pricing_runtime) * 100.0).unwrap();
                        }
                        writeln!(&mut buffered_out, "{}", "⎯".repeat(30)).unwrap();

                        buffered_out.flush().unwrap();

                        break;
                    }
                }
            }

            buffered_out.flush().unwrap();
        });

        Self {
            sender: UISender { sender },
        }
    }
}

#[derive(Clone)]
/// Holds all state updates that can influence the UI
pub enum UIUserMessage {
    LogS(&'static str),
    Log(String),
    TimeLimitReached,
    StartExplore { num_k: usize, budget_secs: f64 },
    StartK { k: usize, budget_secs: f64, num_seeds: usize },

    LpIterationFinish(LpIterationUIState),
    PricingFinish(PricingUIState),
    Evicted { k: usize, count: usize },
    DualSignFlip { k: usize },

    NewBest { obj: f64, k: usize },
    CommitStart { k: usize },
    ExitUi,
}

#[derive(Clone)]
pub struct PricingUIState {
    pub k: usize,
    pub runtime: f64,
    pub accepted: bool,
}

impl Display for PricingUIState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "k=<{}> pricing_runtime=<{:>5.2}> accepted=<{}>", self.k, self.runtime, self.accepted)
    }
}

#[derive(Clone)]
pub struct LpIterationUIState {
    pub k: usize,
    pub iteration: u32,
    pub obj: f64,
    pub num_columns: usize,
    pub lp_runtime: f64,
}

impl Display for LpIterationUIState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "k=<{}> iter=<{}> obj=<{:>10.8}> lp_runtime=<{:>5.2}> cols=<{}>", self.k, self.iteration, self.obj, self.lp_runtime, self.num_columns)
    }
}

#[derive(Clone)]
pub struct UIMessage {
    pub thread_id: ThreadId,
    pub message: UIUserMessage,
}
