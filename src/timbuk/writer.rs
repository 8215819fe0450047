//! Writing the Timbuk textual format

use super::NamedAutomaton;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

impl NamedAutomaton {
    /// Write the automaton in Timbuk format.
    ///
    /// The output is deterministic: symbols in interning order, states and
    /// final states in ascending id order, rules in table order with
    /// symbolic rules expanded to their concrete symbol names.
    pub fn write_timbuk<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        write!(writer, "Ops")?;
        for (name, arity) in self.symbols().symbols() {
            write!(writer, " {}:{}", name, arity)?;
        }
        writeln!(writer)?;
        writeln!(writer)?;

        writeln!(writer, "Automaton {}", self.name())?;
        writeln!(writer)?;

        write!(writer, "States")?;
        for &state in self.automaton().states() {
            write!(writer, " {}:0", self.label_of(state))?;
        }
        writeln!(writer)?;
        writeln!(writer)?;

        write!(writer, "Final States")?;
        for &state in self.automaton().finals() {
            write!(writer, " {}", self.label_of(state))?;
        }
        writeln!(writer)?;
        writeln!(writer)?;

        writeln!(writer, "Transitions")?;
        for rule in self.automaton().rules() {
            for symbol in self.symbols().names_matching(&rule.symbol) {
                for target in rule.targets.iter() {
                    if rule.lhs.is_empty() {
                        write!(writer, "{}", symbol)?;
                    } else {
                        write!(writer, "{}(", symbol)?;
                        for (position, &child) in rule.lhs.iter().enumerate() {
                            if position > 0 {
                                write!(writer, ", ")?;
                            }
                            write!(writer, "{}", self.label_of(child))?;
                        }
                        write!(writer, ")")?;
                    }
                    writeln!(writer, " -> {}", self.label_of(target))?;
                }
            }
        }
        Ok(())
    }

    /// The automaton as a Timbuk format string.
    pub fn to_timbuk_string(&self) -> String {
        let mut buffer = Vec::new();
        self.write_timbuk(&mut buffer)
            .expect("writing to a vector cannot fail");
        String::from_utf8(buffer).expect("Timbuk output is valid UTF-8")
    }

    /// Write the automaton to a Timbuk file.
    pub fn to_timbuk_file<P: AsRef<Path>>(&self, path: P) -> io::Result<()> {
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        self.write_timbuk(&mut writer)?;
        writer.flush()
    }
}
