use std::io::{self, BufRead, Write};

use crate::controller::GenerateText;

const PROMPT: &str = "Enter a prompt to generate text: ";
const EXIT_COMMAND: &str = "exit";

/// Reads prompts line by line until `exit` or end of input. Controller errors are printed
/// and the loop carries on.
pub fn run<G, R, W>(generator: &G, mut input: R, output: &mut W) -> io::Result<()>
where
    G: GenerateText + ?Sized,
    R: BufRead,
    W: Write,
{
    let mut line = String::new();
    loop {
        write!(output, "{PROMPT}")?;
        output.flush()?;

        line.clear();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let prompt = line.trim_end_matches(['\r', '\n']);
        if prompt == EXIT_COMMAND {
            break;
        }

        match generator.generate_text(prompt) {
            Ok(text) => {
                writeln!(output, "Generated text: ")?;
                writeln!(output, "{text}")?;
            }
            Err(err) => writeln!(output, "{err}")?,
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use super::*;
    use crate::controller::ControllerError;

    #[derive(Default)]
    struct Recorder {
        prompts: RefCell<Vec<String>>,
    }

    impl GenerateText for Recorder {
        fn generate_text(&self, prompt: &str) -> Result<String, ControllerError> {
            self.prompts.borrow_mut().push(prompt.to_string());
            if prompt == "fail" {
                Err(ControllerError::Remote("Unknown error".into()))
            } else {
                Ok(format!("{prompt} and then some"))
            }
        }
    }

    #[test]
    fn stops_on_exit() {
        let recorder = Recorder::default();
        let mut out = Vec::new();
        run(&recorder, "Hello\nexit\nnever\n".as_bytes(), &mut out).unwrap();

        assert_eq!(*recorder.prompts.borrow(), vec!["Hello"]);
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Generated text: \nHello and then some\n"));
        assert_eq!(out.matches(PROMPT).count(), 2);
    }

    #[test]
    fn errors_do_not_end_the_loop() {
        let recorder = Recorder::default();
        let mut out = Vec::new();
        run(&recorder, "fail\nagain\r\n".as_bytes(), &mut out).unwrap();

        assert_eq!(*recorder.prompts.borrow(), vec!["fail", "again"]);
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Error: Unknown error\n"));
        assert!(out.contains("again and then some"));
    }
}
