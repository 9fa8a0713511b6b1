// Copyright (C) 2025 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{crate_version, Parser, Subcommand};
use hound::{SampleFormat, WavSpec, WavWriter};
use tracing::info;
use tracing_subscriber::EnvFilter;
use wavefactory::{
    config::RenderConfig,
    midi::{MidiRenderer, MidiSequence},
    sfx::SfxScript,
    wave::{Sample, SampleRate, Wave},
};

#[derive(Parser)]
#[clap(
    author = "Michael Wilson",
    version = crate_version!(),
    about = "Renders MIDI files and procedural sound effects to WAV."
)]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Renders a MIDI file with the built-in additive synthesizer.
    Midi {
        /// The MIDI file to render.
        input: PathBuf,
        /// The WAV file to write.
        output: PathBuf,
        /// An optional YAML render configuration.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Output bit depth: 8, 16, 24 or 32 (float).
        #[arg(short, long, default_value_t = 16)]
        bits: u16,
    },
    /// Renders a JSON sound effect script.
    Sfx {
        /// The script to render.
        script: PathBuf,
        /// The WAV file to write.
        output: PathBuf,
        /// The output sample rate in Hz.
        #[arg(short, long, default_value_t = SampleRate::default())]
        sample_rate: SampleRate,
        /// Output bit depth: 8, 16, 24 or 32 (float).
        #[arg(short, long, default_value_t = 16)]
        bits: u16,
    },
    /// Prints a summary of a MIDI file.
    Info {
        /// The MIDI file to inspect.
        input: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Midi {
            input,
            output,
            config,
            bits,
        } => {
            let config = match config {
                Some(path) => RenderConfig::deserialize(&path)?,
                None => RenderConfig::default(),
            };
            let wave = MidiRenderer::new(config).read_file::<f32>(&input)?;
            write_wav(&output, &wave, bits)?;
            info!(output = %output.display(), bits, "Wrote WAV file");
        }
        Commands::Sfx {
            script,
            output,
            sample_rate,
            bits,
        } => {
            let wave = SfxScript::read(&script)?.render(sample_rate)?;
            write_wav(&output, &wave, bits)?;
            info!(output = %output.display(), bits, "Wrote WAV file");
        }
        Commands::Info { input } => {
            let sequence = MidiSequence::read(&input)?;
            let header = &sequence.header;
            let map = sequence.tempo_map(SampleRate::default().hz());

            println!("{}:", input.display());
            println!("- format: {}", header.format);
            println!("- tracks: {}", header.track_count);
            println!("- division: {} ticks per quarter note", header.division);
            println!("- notes: {}", sequence.notes.len());
            println!("- control events: {}", sequence.controls.len());
            println!("- tempo events: {}", sequence.tempos.len());
            println!(
                "- duration: {:.3}s",
                map.seconds_at(sequence.max_end_tick())
            );
        }
    }

    Ok(())
}

/// Writes a wave as PCM at the given bit depth. 32 bits are written as float.
fn write_wav(path: &Path, wave: &Wave<f32>, bits: u16) -> Result<(), Box<dyn Error>> {
    match bits {
        8 => write_samples(path, &wave.convert::<i8>(), 8, |s| s),
        16 => write_samples(path, &wave.convert::<i16>(), 16, |s| s),
        24 => write_samples(path, &wave.convert::<i32>(), 24, |s: i32| s >> 8),
        32 => write_samples(path, wave, 32, |s| s),
        other => Err(format!("Unsupported bit depth {}, expected 8, 16, 24 or 32", other).into()),
    }
}

fn write_samples<S: Sample + hound::Sample>(
    path: &Path,
    wave: &Wave<S>,
    bits_per_sample: u16,
    scale: impl Fn(S) -> S,
) -> Result<(), Box<dyn Error>> {
    let spec = WavSpec {
        channels: wave.channels().count() as u16,
        sample_rate: wave.sample_rate().hz(),
        bits_per_sample,
        sample_format: if S::FLOAT {
            SampleFormat::Float
        } else {
            SampleFormat::Int
        },
    };

    let mut writer = WavWriter::create(path, spec)?;
    for sample in wave.data() {
        writer.write_sample(scale(*sample))?;
    }
    writer.finalize()?;
    Ok(())
}
