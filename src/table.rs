use std::io::{self, Write};

/// Left-aligned text columns separated by `padding` spaces.  The last column is never padded.
pub struct Table {
	padding: usize,
	rows: Vec<Vec<String>>,
}

impl Table {
	pub fn new(padding: usize) -> Table {
		Table {
			padding,
			rows: Vec::new(),
		}
	}

	pub fn row<I, S>(&mut self, cells: I)
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.rows.push(cells.into_iter().map(Into::into).collect());
	}

	pub fn write_to<W: Write>(&self, out: &mut W) -> io::Result<()> {
		let mut widths: Vec<usize> = Vec::new();
		for row in &self.rows {
			for (idx, cell) in row.iter().enumerate() {
				let len = cell.chars().count();
				match widths.get_mut(idx) {
					Some(w) => *w = (*w).max(len),
					None => widths.push(len),
				}
			}
		}

		for row in &self.rows {
			let mut line = String::new();
			for (idx, cell) in row.iter().enumerate() {
				if idx + 1 == row.len() {
					line.push_str(cell);
				} else {
					let width = widths.get(idx).copied().unwrap_or(0) + self.padding;
					line.push_str(&format!("{:<width$}", cell, width = width));
				}
			}
			writeln!(out, "{}", line)?;
		}
		Ok(())
	}
}
