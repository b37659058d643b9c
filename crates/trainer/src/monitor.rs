//! The loop which keeps writing and displaying entries.

use crate::{error::Error, Address, Entries, Entry, ProcessMemory, RefId, Token};
use crossterm::{
    cursor, queue,
    terminal::{self, ClearType},
};
use std::{fmt, io, thread, time::Duration};

/// The default time to wait between two cycles.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(100);

/// The state of the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    /// The monitor will run another cycle.
    Running,
    /// The monitor has stopped, and will never run again.
    Stopped,
}

/// The outcome of reading a single entry during a cycle.
#[derive(Debug)]
pub struct Reading<'a> {
    /// The reference id of the entry.
    pub id: RefId,
    /// The entry that was read.
    pub entry: &'a Entry,
    /// The resolved address and the value read from it.
    pub result: Result<(Address, i64), Error>,
}

impl fmt::Display for Reading<'_> {
    fn fmt(&self, fmt: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            Ok((address, value)) => write!(fmt, "{} {}={}", self.id, address, value),
            Err(..) => write!(fmt, "{} {}=??", self.id, self.entry),
        }
    }
}

/// Writes and displays a set of entries in a loop.
///
/// Every cycle first writes all entries which have a value, in order, and
/// then reads every entry back. Values written early in a cycle are observed
/// by references and reads later in the same cycle.
pub struct Monitor<'a, M> {
    entries: &'a Entries,
    memory: M,
    header: String,
    once: bool,
    redraw: bool,
    interval: Duration,
    cancel: Option<&'a Token>,
    state: State,
    cycles: usize,
}

impl<'a, M> Monitor<'a, M>
where
    M: ProcessMemory,
{
    /// Construct a new monitor over the given entries.
    pub fn new(entries: &'a Entries, memory: M) -> Self {
        Self {
            entries,
            memory,
            header: String::new(),
            once: false,
            redraw: false,
            interval: DEFAULT_INTERVAL,
            cancel: None,
            state: State::Running,
            cycles: 0,
        }
    }

    /// Set the header to print above the entries in every cycle.
    pub fn header(self, header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            ..self
        }
    }

    /// Only run a single cycle.
    pub fn once(self, once: bool) -> Self {
        Self { once, ..self }
    }

    /// Clear the terminal and redraw in place every cycle.
    pub fn redraw(self, redraw: bool) -> Self {
        Self { redraw, ..self }
    }

    /// Set the time to wait between cycles.
    pub fn interval(self, interval: Duration) -> Self {
        Self { interval, ..self }
    }

    /// Stop the monitor when the given token is set.
    pub fn cancel(self, cancel: &'a Token) -> Self {
        Self {
            cancel: Some(cancel),
            ..self
        }
    }

    /// The current state of the monitor.
    pub fn state(&self) -> State {
        self.state
    }

    /// The number of cycles that have been run.
    pub fn cycles(&self) -> usize {
        self.cycles
    }

    /// Run until the monitor is stopped.
    pub fn run<W>(&mut self, out: &mut W) -> Result<(), Error>
    where
        W: io::Write,
    {
        while self.step(out)? == State::Running {}
        Ok(())
    }

    /// Run a single cycle, then decide if another one should follow.
    ///
    /// This sleeps for the configured interval if the monitor keeps running.
    pub fn step<W>(&mut self, out: &mut W) -> Result<State, Error>
    where
        W: io::Write,
    {
        if self.state == State::Stopped {
            return Ok(State::Stopped);
        }

        let readings = self.cycle();
        self.render(out, &readings)?;
        self.cycles += 1;
        self.state = self.next_state();
        Ok(self.state)
    }

    /// Write every entry that has a value, then read every entry.
    pub fn cycle(&self) -> Vec<Reading<'a>> {
        let entries = self.entries;

        for (id, entry) in entries {
            if entry.is_monitor_only() {
                continue;
            }

            if let Err(e) = self.write(entry) {
                log::debug!("skipping write to {}: {}", id, e);
            }
        }

        let mut readings = Vec::with_capacity(entries.len());

        for (id, entry) in entries {
            let result = entry.read(&self.memory);

            if let Err(e) = &result {
                log::debug!("skipping read of {}: {}", id, e);
            }

            readings.push(Reading { id, entry, result });
        }

        readings
    }

    fn write(&self, entry: &Entry) -> Result<(), Error> {
        let address = entry.resolve(&self.memory)?;

        let value = match self.entries.value_to_write(entry, &self.memory)? {
            Some(value) => value,
            None => return Ok(()),
        };

        log::debug!("writing {} as {} to {}", value, entry.ty, address);
        self.memory.write_value(entry.ty, address, value)
    }

    fn next_state(&self) -> State {
        if self.once {
            return State::Stopped;
        }

        thread::sleep(self.interval);

        if self.cancel.map(Token::is_set).unwrap_or_default() {
            log::debug!("interrupted, stopping");
            return State::Stopped;
        }

        if !self.memory.is_alive() {
            log::debug!("process has exited, stopping");
            return State::Stopped;
        }

        State::Running
    }

    fn render<W>(&self, out: &mut W, readings: &[Reading<'_>]) -> Result<(), Error>
    where
        W: io::Write,
    {
        if self.redraw {
            if self.cycles == 0 {
                queue!(out, terminal::Clear(ClearType::All))?;
            }

            queue!(out, cursor::MoveTo(0, 0))?;
        }

        if !self.header.is_empty() {
            self.render_line(out, &self.header)?;
        }

        for reading in readings {
            self.render_line(out, reading)?;
        }

        out.flush()?;
        Ok(())
    }

    fn render_line<W>(&self, out: &mut W, line: impl fmt::Display) -> Result<(), Error>
    where
        W: io::Write,
    {
        write!(out, "{}", line)?;

        if self.redraw {
            queue!(out, terminal::Clear(ClearType::UntilNewLine))?;
        }

        writeln!(out)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Monitor, Reading, State};
    use crate::{
        error::Error, memory::tests::FakeMemory, Address, Entries, PointerWidth, Token, Type,
    };
    use std::time::Duration;

    fn memory() -> FakeMemory {
        let memory = FakeMemory::new(PointerWidth::Four).with_base(0x40_0000);
        memory.map(0x40_0000, 0x100);
        memory.map(0x1000, 0x100);
        memory
    }

    fn monitor<'a>(entries: &'a Entries, memory: &'a FakeMemory) -> Monitor<'a, &'a FakeMemory> {
        Monitor::new(entries, memory).interval(Duration::from_millis(0))
    }

    #[test]
    fn once_runs_exactly_one_cycle() -> Result<(), Error> {
        let memory = memory();
        let entries = Entries::parse(&["+10=1000", "+20=R1"])?;

        let mut m = monitor(&entries, &memory).once(true);
        let mut out = Vec::new();
        m.run(&mut out)?;

        assert_eq!(1, m.cycles());
        assert_eq!(State::Stopped, m.state());
        assert_eq!(Some(1000), memory.peek(Type::I32, 0x40_0010));
        assert_eq!(Some(1000), memory.peek(Type::I32, 0x40_0020));
        Ok(())
    }

    #[test]
    fn once_ignores_liveness() -> Result<(), Error> {
        let memory = memory();
        memory.exit_after(0);
        let entries = Entries::parse(&["+10"])?;

        let mut m = monitor(&entries, &memory).once(true);
        m.run(&mut Vec::new())?;
        assert_eq!(1, m.cycles());
        Ok(())
    }

    #[test]
    fn runs_until_process_exits() -> Result<(), Error> {
        let memory = memory();
        memory.exit_after(2);
        let entries = Entries::parse(&["1000=5"])?;

        let mut m = monitor(&entries, &memory);
        m.run(&mut Vec::new())?;

        assert_eq!(3, m.cycles());
        assert_eq!(3, memory.writes.borrow().len());
        // stopped monitors never run again.
        assert_eq!(State::Stopped, m.step(&mut Vec::new())?);
        assert_eq!(3, m.cycles());
        Ok(())
    }

    #[test]
    fn stops_when_cancelled() -> Result<(), Error> {
        let memory = memory();
        let entries = Entries::parse(&["1000"])?;
        let token = Token::new();

        let mut m = monitor(&entries, &memory).cancel(&token);
        assert_eq!(State::Running, m.step(&mut Vec::new())?);
        token.set();
        assert_eq!(State::Stopped, m.step(&mut Vec::new())?);
        assert_eq!(2, m.cycles());
        Ok(())
    }

    #[test]
    fn monitor_only_entries_are_never_written() -> Result<(), Error> {
        let memory = memory();
        memory.poke(Type::I32, 0x1000, 7);
        let entries = Entries::parse(&["1000", "#1000", "S:1010", "1020=3"])?;

        monitor(&entries, &memory).once(true).run(&mut Vec::new())?;

        let writes = memory.writes.borrow();
        assert_eq!(1, writes.len());
        assert_eq!(Address::new(0x1020), writes[0].0);
        assert_eq!(Some(7), memory.peek(Type::I32, 0x1000));
        Ok(())
    }

    #[test]
    fn reference_observes_write_from_same_cycle() -> Result<(), Error> {
        let memory = memory();
        memory.poke(Type::I32, 0x40_0010, 1);
        let entries = Entries::parse(&["+10=1000", "+20=R1"])?;

        let m = monitor(&entries, &memory);
        let readings = m.cycle();

        assert_eq!(Some(1000), memory.peek(Type::I32, 0x40_0020));
        assert_eq!(1000, readings[1].result.as_ref().expect("read").1);
        Ok(())
    }

    #[test]
    fn forward_reference_reads_live_memory() -> Result<(), Error> {
        let memory = memory();
        memory.poke(Type::I32, 0x1010, 1);
        let entries = Entries::parse(&["1000=R2", "1010=2"])?;

        let m = monitor(&entries, &memory);
        m.cycle();
        // first cycle copies the value from before entry 2 was written.
        assert_eq!(Some(1), memory.peek(Type::I32, 0x1000));
        m.cycle();
        assert_eq!(Some(2), memory.peek(Type::I32, 0x1000));
        Ok(())
    }

    #[test]
    fn reference_chain_propagates_one_entry_per_cycle() -> Result<(), Error> {
        let memory = memory();
        let entries = Entries::parse(&["1000=R2", "1010=R3", "1020=7"])?;
        let m = monitor(&entries, &memory);

        fn values(readings: Vec<Reading<'_>>) -> Vec<Option<i64>> {
            readings
                .iter()
                .map(|r| r.result.as_ref().ok().map(|&(_, value)| value))
                .collect()
        }

        assert_eq!(vec![Some(0), Some(0), Some(7)], values(m.cycle()));
        assert_eq!(vec![Some(0), Some(7), Some(7)], values(m.cycle()));
        assert_eq!(vec![Some(7), Some(7), Some(7)], values(m.cycle()));
        assert_eq!(Some(7), memory.peek(Type::I32, 0x1000));
        Ok(())
    }

    #[test]
    fn reference_converts_between_types() -> Result<(), Error> {
        let memory = memory();
        memory.poke(Type::I32, 0x1000, 0x1_2345);
        let entries = Entries::parse(&["1000", "S:1010=R1", "B:1020=R1"])?;

        let readings = monitor(&entries, &memory).cycle();
        assert_eq!(0x2345, readings[1].result.as_ref().expect("read").1);
        assert_eq!(0x45, readings[2].result.as_ref().expect("read").1);
        Ok(())
    }

    #[test]
    fn failures_skip_only_the_entry() -> Result<(), Error> {
        let memory = memory();
        let entries = Entries::parse(&["#5000=1", "1000=2", "9000"])?;

        let readings = monitor(&entries, &memory).cycle();
        assert!(readings[0].result.is_err());
        assert_eq!((Address::new(0x1000), 2), *readings[1].result.as_ref().expect("read"));
        assert!(readings[2].result.is_err());
        Ok(())
    }

    #[test]
    fn renders_header_and_entries() -> Result<(), Error> {
        let memory = memory();
        memory.poke(Type::I32, 0x1000, -3);
        let entries = Entries::parse(&["1000", "#9000"])?;

        let mut out = Vec::new();
        monitor(&entries, &memory)
            .header("game.exe(42)")
            .once(true)
            .run(&mut out)?;

        let out = String::from_utf8(out).expect("utf-8 output");
        assert_eq!("game.exe(42)\nR1 0x00001000=-3\nR2 #9000=??\n", out);
        Ok(())
    }
}
