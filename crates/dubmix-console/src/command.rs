//! Line commands read from stdin

use std::path::PathBuf;
use std::str::FromStr;

use dubmix_core::{DelayModel, DelayParams, DubmixError, FrequencyBand, SirenMode, SirenModel, SirenParams};
use thiserror::Error;

pub const HELP: &str = "\
commands:
  play | pause | stop
  gain <band> <0..1>            band: sub bass mid high tweet (or 1-5)
  mute <band> | unmute <band>
  eq <0..9> <dB>
  siren on | siren off
  siren <freq> <rate> <mode> <level>   mode: roots digital alarm (or 0-2)
  delay <time> <fb> <return> <music> <siren> <hp> <lp>
  model siren <retro|rack|modular> | model delay <tape|digital|bbd>
  load <file.wav>
  meters | status | help | quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Play,
    Pause,
    Stop,
    Gain(FrequencyBand, f32),
    Mute(FrequencyBand, bool),
    Eq(usize, f32),
    SirenGate(bool),
    Siren(SirenParams),
    Delay(DelayParams),
    SirenModel(SirenModel),
    DelayModel(DelayModel),
    Load(PathBuf),
    Meters,
    Status,
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    Unknown(String),
    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),
    #[error("Not a number: {0}")]
    InvalidNumber(String),
    #[error("Unknown model: {0}")]
    UnknownModel(String),
    #[error(transparent)]
    Identifier(#[from] DubmixError),
}

struct Args<'a> {
    words: std::str::SplitWhitespace<'a>,
}

impl<'a> Args<'a> {
    fn word(&mut self, name: &'static str) -> Result<&'a str, CommandError> {
        self.words.next().ok_or(CommandError::MissingArgument(name))
    }

    fn number<T: FromStr>(&mut self, name: &'static str) -> Result<T, CommandError> {
        let word = self.word(name)?;
        word.parse().map_err(|_| CommandError::InvalidNumber(word.to_string()))
    }

    fn band(&mut self) -> Result<FrequencyBand, CommandError> {
        Ok(self.word("band")?.parse()?)
    }
}

/// Parse one input line. Blank lines and `#` comments give `None`.
pub fn parse_command(line: &str) -> Result<Option<Command>, CommandError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let mut words = line.split_whitespace();
    let Some(name) = words.next() else {
        return Ok(None);
    };
    let mut args = Args { words };

    let command = match name.to_ascii_lowercase().as_str() {
        "play" => Command::Play,
        "pause" => Command::Pause,
        "stop" => Command::Stop,
        "gain" => {
            let band = args.band()?;
            Command::Gain(band, args.number("gain")?)
        }
        "mute" => Command::Mute(args.band()?, true),
        "unmute" => Command::Mute(args.band()?, false),
        "eq" => {
            let index = args.number("index")?;
            Command::Eq(index, args.number("dB")?)
        }
        "siren" => parse_siren(&mut args)?,
        "delay" => Command::Delay(DelayParams {
            time_secs: args.number("time")?,
            feedback: args.number("feedback")?,
            return_level: args.number("return")?,
            music_send: args.number("music send")?,
            siren_send: args.number("siren send")?,
            highpass_hz: args.number("highpass")?,
            lowpass_hz: args.number("lowpass")?,
        }),
        "model" => parse_model(&mut args)?,
        "load" => {
            // keep spaces in paths
            let rest: Vec<&str> = args.words.collect();
            if rest.is_empty() {
                return Err(CommandError::MissingArgument("path"));
            }
            Command::Load(PathBuf::from(rest.join(" ")))
        }
        "meters" => Command::Meters,
        "status" => Command::Status,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

fn parse_siren(args: &mut Args<'_>) -> Result<Command, CommandError> {
    let first = args.word("on|off|params")?;
    match first.to_ascii_lowercase().as_str() {
        "on" => return Ok(Command::SirenGate(true)),
        "off" => return Ok(Command::SirenGate(false)),
        _ => {}
    }
    let frequency_hz = first
        .parse()
        .map_err(|_| CommandError::InvalidNumber(first.to_string()))?;
    let lfo_rate_hz = args.number("rate")?;
    let mode: SirenMode = args.word("mode")?.parse()?;
    let level = args.number("level")?;
    Ok(Command::Siren(SirenParams {
        frequency_hz,
        lfo_rate_hz,
        mode,
        level,
    }))
}

fn parse_model(args: &mut Args<'_>) -> Result<Command, CommandError> {
    let unit = args.word("siren|delay")?.to_ascii_lowercase();
    let name = args.word("model")?;
    let command = match (unit.as_str(), name.to_ascii_lowercase().as_str()) {
        ("siren", "retro") => Command::SirenModel(SirenModel::RetroBox),
        ("siren", "rack") => Command::SirenModel(SirenModel::DigitalRack),
        ("siren", "modular") => Command::SirenModel(SirenModel::ModularSynth),
        ("delay", "tape") => Command::DelayModel(DelayModel::TapeEcho),
        ("delay", "digital") => Command::DelayModel(DelayModel::DigitalDelay),
        ("delay", "bbd") => Command::DelayModel(DelayModel::BucketBrigade),
        _ => return Err(CommandError::UnknownModel(format!("{unit} {name}"))),
    };
    Ok(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_and_comments() {
        assert_eq!(parse_command(""), Ok(None));
        assert_eq!(parse_command("   "), Ok(None));
        assert_eq!(parse_command("# warmup"), Ok(None));
    }

    #[test]
    fn test_transport_and_info() {
        assert_eq!(parse_command("play"), Ok(Some(Command::Play)));
        assert_eq!(parse_command("PAUSE"), Ok(Some(Command::Pause)));
        assert_eq!(parse_command("stop"), Ok(Some(Command::Stop)));
        assert_eq!(parse_command("meters"), Ok(Some(Command::Meters)));
        assert_eq!(parse_command("exit"), Ok(Some(Command::Quit)));
    }

    #[test]
    fn test_band_commands() {
        assert_eq!(
            parse_command("gain bass 0.8"),
            Ok(Some(Command::Gain(FrequencyBand::Bass, 0.8)))
        );
        assert_eq!(
            parse_command("mute 1"),
            Ok(Some(Command::Mute(FrequencyBand::Sub, true)))
        );
        assert_eq!(
            parse_command("unmute top"),
            Ok(Some(Command::Mute(FrequencyBand::Tweet, false)))
        );
        assert!(matches!(
            parse_command("mute treble"),
            Err(CommandError::Identifier(DubmixError::UnknownBand(_)))
        ));
        assert_eq!(
            parse_command("gain sub"),
            Err(CommandError::MissingArgument("gain"))
        );
    }

    #[test]
    fn test_eq() {
        assert_eq!(parse_command("eq 3 -4.5"), Ok(Some(Command::Eq(3, -4.5))));
        assert_eq!(
            parse_command("eq x 1"),
            Err(CommandError::InvalidNumber("x".into()))
        );
    }

    #[test]
    fn test_siren() {
        assert_eq!(parse_command("siren on"), Ok(Some(Command::SirenGate(true))));
        assert_eq!(parse_command("siren OFF"), Ok(Some(Command::SirenGate(false))));
        assert_eq!(
            parse_command("siren 440 5 digital 0.3"),
            Ok(Some(Command::Siren(SirenParams {
                frequency_hz: 440.0,
                lfo_rate_hz: 5.0,
                mode: SirenMode::Digital,
                level: 0.3,
            })))
        );
        assert!(parse_command("siren 440 5 wobble 0.3").is_err());
    }

    #[test]
    fn test_delay() {
        let command = parse_command("delay 0.3 0.4 0.5 1 0 100 3000").unwrap();
        assert_eq!(
            command,
            Some(Command::Delay(DelayParams {
                time_secs: 0.3,
                feedback: 0.4,
                return_level: 0.5,
                music_send: 1.0,
                siren_send: 0.0,
                highpass_hz: 100.0,
                lowpass_hz: 3000.0,
            }))
        );
        assert_eq!(
            parse_command("delay 0.3 0.4"),
            Err(CommandError::MissingArgument("return"))
        );
    }

    #[test]
    fn test_models() {
        assert_eq!(
            parse_command("model delay bbd"),
            Ok(Some(Command::DelayModel(DelayModel::BucketBrigade)))
        );
        assert_eq!(
            parse_command("model siren rack"),
            Ok(Some(Command::SirenModel(SirenModel::DigitalRack)))
        );
        assert!(matches!(
            parse_command("model siren tape"),
            Err(CommandError::UnknownModel(_))
        ));
    }

    #[test]
    fn test_load_keeps_spaces() {
        assert_eq!(
            parse_command("load /tmp/dub plates/riddim.wav"),
            Ok(Some(Command::Load(PathBuf::from("/tmp/dub plates/riddim.wav"))))
        );
        assert_eq!(parse_command("load"), Err(CommandError::MissingArgument("path")));
    }

    #[test]
    fn test_unknown() {
        assert_eq!(
            parse_command("rewind"),
            Err(CommandError::Unknown("rewind".into()))
        );
    }
}
