use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, StreamConfig};
use tokio::io::{AsyncBufReadExt, BufReader, Stdin};
use tokio::sync::mpsc;

use afrolearn_audio::narration::{NarrationPlayer, NarrationState};
use afrolearn_audio::recorder::{TRANSCRIPTION_MIME_TYPE, WavRecorder};
use afrolearn_audio::{Activity, MonotonicClock};
use afrolearn_core::catalog::FEATURED_SESSIONS;
use afrolearn_core::controller::{SessionController, Update};
use afrolearn_core::mindmap::MindMap;
use afrolearn_core::onboarding::UserSession;
use afrolearn_core::workspace::{LiveStatus, Tab, UploadedFile, Workspace};
use afrolearn_gemini::GeminiClient;

use crate::config::Config;
use crate::live::{LiveAudioSession, LiveEvent};
use crate::narrator::{NarrationEvent, Narrator};

type Lines = tokio::io::Lines<BufReader<Stdin>>;

/// A microphone capture in progress for transcription.
struct Recording {
    // Dropping the stream stops the callbacks.
    _stream: cpal::Stream,
    recorder: Arc<Mutex<WavRecorder>>,
    sample_rate: f64,
}

pub fn print_dashboard(language: &afrolearn_core::Language) {
    println!("\n{} {} — AfroLearnAI", language.flag, language.greeting);
    println!("Featured sessions:");
    for session in &FEATURED_SESSIONS {
        println!(
            "  [{}] {} — {} ({} sources, {})",
            session.id, session.title, session.subtitle, session.source_count, session.date
        );
    }
    println!("\nType a topic to start, or /help for commands.");
}

fn print_help() {
    println!(
        "Commands:\n\
         <topic>              ask the tutor (article style)\n\
         /send                submit the transcribed question (narration style)\n\
         /tab <summary|audio|map|info>\n\
         /map                 generate the concept map\n\
         /zoom <in|out>  /pan <dx> <dy>  /drag <id> <dx> <dy>  /fit\n\
         /audio               play, pause or resume the audio overview\n\
         /image               generate an infographic poster\n\
         /record              start or stop a voice question\n\
         /live                start the live conversation   /end to hang up\n\
         /files <name>...     register dropped files\n\
         /demo                load the demo session\n\
         /back                back to the dashboard\n\
         /quit"
    );
}

fn render_map(map: &MindMap) {
    let t = map.transform;
    println!(
        "Mind map ({} nodes, {} edges; pan {:.0},{:.0} zoom {:.2}):",
        map.nodes.len(),
        map.edges.len(),
        t.x,
        t.y,
        t.k
    );
    for node in &map.nodes {
        let indent = "  ".repeat(node.level as usize + 1);
        println!("{indent}{} ({:.0}, {:.0})", node.label, node.x, node.y);
    }
}

fn guess_mime(name: &str) -> &'static str {
    match name.rsplit('.').next() {
        Some("pdf") => "application/pdf",
        Some("txt") | Some("md") => "text/plain",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

fn image_extension(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        _ => "png",
    }
}

fn status_text(activity: Activity, live: LiveStatus) -> &'static str {
    match activity {
        Activity::Speaking => "AfroLearn is speaking...",
        Activity::Listening => "Listening...",
        Activity::Idle if live == LiveStatus::Connected => "Thinking...",
        Activity::Idle => "Connecting...",
    }
}

fn start_recording(input_device: &Device) -> Result<Recording> {
    let config = input_device
        .default_input_config()
        .context("failed to get default input config")?;
    let config = StreamConfig {
        channels: config.channels(),
        sample_rate: config.sample_rate(),
        buffer_size: cpal::BufferSize::Default,
    };
    let sample_rate = config.sample_rate.0 as f64;
    let channels = config.channels as usize;

    let recorder = Arc::new(Mutex::new(WavRecorder::new(sample_rate)?));
    let sink = Arc::clone(&recorder);
    let stream = input_device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                if let Ok(mut recorder) = sink.lock() {
                    recorder.push(data, channels);
                }
            },
            move |err| tracing::error!("recording stream error: {err}"),
            None,
        )
        .context("could not access microphone; check permissions")?;
    stream.play().context("failed to start recording stream")?;
    Ok(Recording {
        _stream: stream,
        recorder,
        sample_rate,
    })
}

fn finish_recording(recording: Recording) -> Result<Vec<u8>> {
    let Recording {
        _stream,
        recorder,
        sample_rate,
    } = recording;
    drop(_stream);
    let recorder = match Arc::try_unwrap(recorder) {
        Ok(mutex) => mutex.into_inner().unwrap_or_else(|e| e.into_inner()),
        Err(arc) => {
            let mut guard = arc.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::replace(&mut *guard, WavRecorder::new(sample_rate)?)
        }
    };
    if recorder.is_empty() {
        anyhow::bail!("no audio captured");
    }
    recorder.finalize()
}

pub async fn run(
    config: Config,
    user: UserSession,
    input_device: Device,
    output_device: Device,
    demo: bool,
) -> Result<()> {
    let language = user.language;
    let backend =
        GeminiClient::new(config.api_key.clone(), language).with_chat_model(config.chat_model.clone());
    let workspace = Workspace::new(language);
    let mut controller = SessionController::new(Arc::new(backend), workspace);
    let mut events = controller.take_events()?;

    let mut player = NarrationPlayer::new(MonotonicClock::new());
    let (narration_tx, mut narration_rx) = mpsc::channel::<NarrationEvent>(8);
    let mut narrator: Option<Narrator> = None;

    let mut live: Option<LiveAudioSession> = None;
    let mut last_activity = Activity::Idle;
    let mut ticker = tokio::time::interval(std::time::Duration::from_millis(120));

    let mut recording: Option<Recording> = None;
    let mut pending_input: Option<String> = None;

    let mut lines: Lines = BufReader::new(tokio::io::stdin()).lines();

    print_dashboard(language);
    if demo {
        controller.workspace.load_demo();
        if let Some(map) = controller.workspace.mind_map() {
            render_map(map);
        }
    }

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("stdin closed")? else {
                    break;
                };
                let line = line.trim().to_string();
                if line.is_empty() {
                    continue;
                }
                if !handle_line(
                    &line,
                    &config,
                    &mut controller,
                    &mut player,
                    &mut narrator,
                    &narration_tx,
                    &mut live,
                    &mut recording,
                    &mut pending_input,
                    &input_device,
                    &output_device,
                )
                .await?
                {
                    break;
                }
            }

            outcome = events.recv() => {
                let Some(outcome) = outcome else { break };
                let update = controller.apply(outcome);
                handle_update(
                    update,
                    &mut controller,
                    &mut player,
                    &mut narrator,
                    &narration_tx,
                    &output_device,
                    &mut pending_input,
                )?;
            }

            event = narration_rx.recv() => {
                if let Some(NarrationEvent::Finished) = event {
                    player.finished();
                    if let Some(narrator) = narrator.as_mut() {
                        narrator.clear_finished();
                    }
                    println!("Audio overview finished.");
                }
            }

            event = async {
                match live.as_mut() {
                    Some(session) => session.next_event().await,
                    None => std::future::pending().await,
                }
            } => {
                match event {
                    Some(LiveEvent::Connected) => {
                        controller.workspace.set_live(LiveStatus::Connected);
                        println!("Conversation is active. /end to hang up.");
                    }
                    Some(LiveEvent::Interrupted) => {
                        tracing::debug!("interrupted by user");
                    }
                    Some(LiveEvent::TurnComplete) => {
                        tracing::debug!("model turn complete");
                    }
                    None => {
                        // The remote side went away; tear down fully.
                        if let Some(session) = live.take() {
                            session.shutdown();
                        }
                        controller.workspace.set_live(LiveStatus::Disconnected);
                        println!("Live session ended.");
                    }
                }
            }

            _ = ticker.tick() => {
                if let Some(session) = live.as_ref() {
                    if controller.workspace.live() == LiveStatus::Connected {
                        let activity = session.activity();
                        if activity != last_activity {
                            last_activity = activity;
                            let bars = (session.display_level() * 10.0).round() as usize;
                            println!(
                                "{} {}",
                                status_text(activity, controller.workspace.live()),
                                "|".repeat(bars.max(1))
                            );
                        }
                    }
                }
            }
        }
    }

    // Teardown on every exit path.
    if let Some(session) = live.take() {
        session.shutdown();
    }
    if let Some(narrator) = narrator.as_mut() {
        narrator.stop();
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn handle_line(
    line: &str,
    config: &Config,
    controller: &mut SessionController<GeminiClient>,
    player: &mut NarrationPlayer<MonotonicClock>,
    narrator: &mut Option<Narrator>,
    narration_tx: &mpsc::Sender<NarrationEvent>,
    live: &mut Option<LiveAudioSession>,
    recording: &mut Option<Recording>,
    pending_input: &mut Option<String>,
    input_device: &Device,
    output_device: &Device,
) -> Result<bool> {
    let mut parts = line.split_whitespace();
    let head = parts.next().unwrap_or_default();

    match head {
        "/quit" => return Ok(false),
        "/help" => print_help(),
        "/back" => print_dashboard(controller.workspace.language),
        "/demo" => {
            controller.workspace.load_demo();
            if let Some(map) = controller.workspace.mind_map() {
                render_map(map);
            }
        }
        "/tab" => {
            let tab = match parts.next() {
                Some("summary") => Some(Tab::Summary),
                Some("audio") => Some(Tab::Audio),
                Some("map") => Some(Tab::MindMap),
                Some("info") => Some(Tab::Infographic),
                _ => None,
            };
            match tab {
                Some(tab) => {
                    controller.workspace.switch_tab(tab);
                    render_tab(controller);
                }
                None => println!("Usage: /tab <summary|audio|map|info>"),
            }
        }
        "/map" => {
            if controller.request_mind_map() {
                println!("Generating mind map...");
            } else {
                println!("Ask a question first.");
            }
        }
        "/image" => {
            if controller.request_infographic() {
                println!("Generating infographic...");
            } else {
                println!("Ask a question first.");
            }
        }
        "/zoom" => {
            if let Some(map) = controller.workspace.mind_map_mut() {
                match parts.next() {
                    Some("in") => map.transform.zoom_in(),
                    Some("out") => map.transform.zoom_out(),
                    _ => println!("Usage: /zoom <in|out>"),
                }
                println!("zoom {:.2}", map.transform.k);
            } else {
                println!("No mind map yet.");
            }
        }
        "/pan" => {
            let (dx, dy) = (
                parts.next().and_then(|v| v.parse::<f64>().ok()),
                parts.next().and_then(|v| v.parse::<f64>().ok()),
            );
            match (controller.workspace.mind_map_mut(), dx, dy) {
                (Some(map), Some(dx), Some(dy)) => {
                    map.transform.pan(dx, dy);
                    println!("pan {:.0},{:.0}", map.transform.x, map.transform.y);
                }
                (None, ..) => println!("No mind map yet."),
                _ => println!("Usage: /pan <dx> <dy>"),
            }
        }
        "/drag" => {
            let id = parts.next().map(str::to_string);
            let (dx, dy) = (
                parts.next().and_then(|v| v.parse::<f64>().ok()),
                parts.next().and_then(|v| v.parse::<f64>().ok()),
            );
            match (controller.workspace.mind_map_mut(), id, dx, dy) {
                (Some(map), Some(id), Some(dx), Some(dy)) => {
                    map.drag(&id, dx, dy);
                    render_map(map);
                }
                (None, ..) => println!("No mind map yet."),
                _ => println!("Usage: /drag <id> <dx> <dy>"),
            }
        }
        "/fit" => {
            if let Some(map) = controller.workspace.mind_map_mut() {
                map.fit_view();
                println!("view reset");
            }
        }
        "/audio" => {
            if player.state() == NarrationState::Playing {
                if let Some(narrator) = narrator.as_mut() {
                    narrator.stop();
                }
                let offset = player.pause();
                println!("Paused at {offset:.1}s.");
            } else if player.has_audio() {
                if let Some(cue) = player.resume() {
                    play_cue(narrator, narration_tx, output_device, &cue)?;
                    println!("Resumed at {:.1}s.", cue.offset_secs);
                }
            } else if controller.request_narration() {
                println!("Generating audio overview...");
            } else {
                println!("Nothing to narrate yet.");
            }
        }
        "/record" => match recording.take() {
            Some(active) => {
                println!("Transcribing...");
                match finish_recording(active) {
                    Ok(bytes) => controller
                        .submit_transcription(bytes, TRANSCRIPTION_MIME_TYPE.to_string()),
                    Err(e) => {
                        tracing::error!("recording failed: {e:#}");
                        println!("Could not transcribe audio.");
                    }
                }
            }
            None => match start_recording(input_device) {
                Ok(active) => {
                    *recording = Some(active);
                    println!("Recording... /record again to stop.");
                }
                Err(e) => {
                    tracing::error!("microphone error: {e:#}");
                    println!("Could not access microphone. Please ensure permissions are granted.");
                }
            },
        },
        "/live" => {
            if live.is_some() {
                println!("Live conversation already running; /end to hang up.");
            } else {
                // Stop any standard playback first.
                if player.state() == NarrationState::Playing {
                    if let Some(narrator) = narrator.as_mut() {
                        narrator.stop();
                    }
                    player.pause();
                }
                controller.workspace.set_live(LiveStatus::Connecting);
                println!("Establishing secure real-time connection...");
                let mut live_config = afrolearn_live::Config::new(config.api_key.clone());
                if !config.live_model.is_empty() {
                    live_config = live_config.with_model(config.live_model.clone());
                }
                let topic = controller.workspace.query().map(str::to_string);
                match LiveAudioSession::start(
                    live_config,
                    controller.workspace.language,
                    topic.as_deref(),
                    input_device,
                    output_device,
                )
                .await
                {
                    Ok(session) => {
                        *live = Some(session);
                    }
                    Err(e) => {
                        tracing::error!("failed to start live session: {e:#}");
                        controller.workspace.set_live(LiveStatus::Disconnected);
                        println!(
                            "Failed to start live conversation. Please check microphone permissions."
                        );
                    }
                }
            }
        }
        "/end" => {
            if let Some(session) = live.take() {
                session.shutdown();
                controller.workspace.set_live(LiveStatus::Disconnected);
                println!("Live session ended.");
            }
        }
        "/files" => {
            let files: Vec<UploadedFile> = parts
                .map(|name| UploadedFile {
                    name: name.to_string(),
                    mime_type: guess_mime(name).to_string(),
                    size: std::fs::metadata(name).map(|m| m.len()).unwrap_or(0),
                })
                .collect();
            if files.is_empty() {
                println!("Usage: /files <name>...");
            } else {
                println!("Added {} source(s).", files.len());
                if let Some(auto_query) = controller.workspace.add_files(files) {
                    println!("> {auto_query}");
                    begin_submission(player, narrator);
                    controller.submit_query(&auto_query);
                }
            }
        }
        "/send" => match pending_input.take() {
            Some(text) => {
                begin_submission(player, narrator);
                controller.submit_query(&text);
                println!("Thinking...");
            }
            None => println!("Nothing to send; /record a question first."),
        },
        _ if head.starts_with('/') => println!("Unknown command; /help lists them."),
        _ => {
            // Plain text: a typed question.
            controller.workspace.mark_typed();
            begin_submission(player, narrator);
            controller.submit_query(line);
            println!("Thinking...");
        }
    }
    Ok(true)
}

/// A new query invalidates the cached narration; stop and forget it before
/// submitting.
fn begin_submission(player: &mut NarrationPlayer<MonotonicClock>, narrator: &mut Option<Narrator>) {
    if let Some(narrator) = narrator.as_mut() {
        narrator.stop();
    }
    player.clear();
}

fn play_cue(
    narrator: &mut Option<Narrator>,
    narration_tx: &mpsc::Sender<NarrationEvent>,
    output_device: &Device,
    cue: &afrolearn_audio::narration::PlaybackCue,
) -> Result<()> {
    // The output graph is acquired lazily on first use.
    if narrator.is_none() {
        *narrator = Some(Narrator::new(output_device.clone(), narration_tx.clone())?);
    }
    if let Some(narrator) = narrator.as_mut() {
        narrator.play(cue)?;
    }
    Ok(())
}

fn handle_update(
    update: Option<Update>,
    controller: &mut SessionController<GeminiClient>,
    player: &mut NarrationPlayer<MonotonicClock>,
    narrator: &mut Option<Narrator>,
    narration_tx: &mpsc::Sender<NarrationEvent>,
    output_device: &Device,
    pending_input: &mut Option<String>,
) -> Result<()> {
    let Some(update) = update else {
        return Ok(());
    };
    match update {
        Update::SummaryReady | Update::SummaryFailed => {
            if let Some(summary) = controller.workspace.summary() {
                println!("\n{summary}\n");
            }
        }
        Update::MindMapReady => {
            if let Some(map) = controller.workspace.mind_map() {
                render_map(map);
            }
        }
        Update::MindMapFailed => println!("Mind map generation failed."),
        Update::NarrationReady(samples) => {
            let cue = player.load(samples);
            if let Some(duration) = player.duration() {
                println!("Playing audio overview ({duration:.0}s). /audio to pause.");
            }
            play_cue(narrator, narration_tx, output_device, &cue)?;
        }
        Update::NarrationFailed => println!("Error generating speech. Please try again."),
        Update::InfographicReady => {
            if let Some(image) = controller.workspace.infographic() {
                let path = format!("infographic.{}", image_extension(&image.mime_type));
                match std::fs::write(&path, &image.data) {
                    Ok(()) => println!("Infographic saved to {path}."),
                    Err(e) => {
                        tracing::error!("failed to save infographic: {e}");
                        println!("Could not save the infographic.");
                    }
                }
            }
        }
        Update::InfographicFailed => println!("Could not generate infographic at this time."),
        Update::TranscriptionReady(text) => {
            println!("Transcribed: {text}");
            println!("/send to ask it, or type a different question.");
            *pending_input = Some(text);
        }
        Update::TranscriptionFailed => println!("Could not transcribe audio."),
    }
    Ok(())
}

fn render_tab(controller: &SessionController<GeminiClient>) {
    match controller.workspace.tab() {
        Tab::Summary => {
            match controller.workspace.summary() {
                Some(summary) => println!("\n{summary}\n"),
                None => println!("No summary yet."),
            }
        }
        Tab::Audio => println!("/audio to generate or control the audio overview."),
        Tab::MindMap => match controller.workspace.mind_map() {
            Some(map) => render_map(map),
            None => println!("/map to generate the concept map."),
        },
        Tab::Infographic => match controller.workspace.infographic() {
            Some(image) => println!("Infographic ready ({} bytes).", image.data.len()),
            None => println!("/image to generate the infographic."),
        },
    }
}
