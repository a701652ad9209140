//! Local Player - mpv/VLC launcher
//!
//! Plays a library file in an external player and waits for it to exit.

use std::ffi::OsString;
use std::path::Path;
use std::process::Stdio;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::{Child, Command};
use tracing::{debug, info};

#[cfg(target_os = "macos")]
const VLC_APP_BINARY: &str = "/Applications/VLC.app/Contents/MacOS/VLC";

/// External players the library can hand episodes to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PlayerType {
    #[default]
    Mpv,
    Vlc,
}

impl PlayerType {
    /// Executable to spawn
    pub fn command(&self) -> &'static str {
        #[cfg(target_os = "macos")]
        if *self == PlayerType::Vlc && Path::new(VLC_APP_BINARY).exists() {
            return VLC_APP_BINARY;
        }
        self.name()
    }

    /// Lowercase name as used in config and on the command line
    fn name(&self) -> &'static str {
        match self {
            PlayerType::Mpv => "mpv",
            PlayerType::Vlc => "vlc",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            PlayerType::Mpv => "mpv",
            PlayerType::Vlc => "VLC",
        }
    }

    /// Arguments for playing `media`, episode path first
    pub fn args(&self, media: &Path, subtitle: Option<&Path>) -> Vec<OsString> {
        let mut args = vec![media.as_os_str().to_os_string()];
        match (self, subtitle) {
            (PlayerType::Mpv, Some(sub)) => {
                let mut flag = OsString::from("--sub-file=");
                flag.push(sub.as_os_str());
                args.push(flag);
            }
            (PlayerType::Vlc, Some(sub)) => {
                args.push("--sub-file".into());
                args.push(sub.as_os_str().to_os_string());
            }
            (_, None) => {}
        }
        args
    }
}

impl std::fmt::Display for PlayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("{0} is not installed or not on PATH")]
    NotFound(&'static str),

    #[error("Could not launch the player: {0}")]
    StartFailed(#[source] std::io::Error),
}

/// Launches one kind of player
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalPlayer {
    kind: PlayerType,
}

impl LocalPlayer {
    pub fn new(kind: PlayerType) -> Self {
        Self { kind }
    }

    pub fn player_type(&self) -> PlayerType {
        self.kind
    }

    /// Whether the player executable can be found
    pub async fn is_available(&self) -> bool {
        let program = self.kind.command();
        if Path::new(program).is_absolute() {
            return Path::new(program).is_file();
        }

        let lookup = Command::new("which")
            .arg(program)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        matches!(lookup, Ok(status) if status.success())
    }

    /// Spawn the player on `media` with an optional subtitle file
    pub fn play(&self, media: &Path, subtitle: Option<&Path>) -> Result<Child, PlayerError> {
        let program = self.kind.command();
        info!(
            player = %self.kind,
            media = %media.display(),
            subtitle = ?subtitle,
            "Launching player"
        );

        // The player owns the terminal while it runs
        Command::new(program)
            .args(self.kind.args(media, subtitle))
            .stdin(Stdio::inherit())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => PlayerError::NotFound(program),
                _ => PlayerError::StartFailed(e),
            })
    }

    /// Play and wait for the player to close; its exit status is not inspected
    pub async fn play_and_wait(
        &self,
        media: &Path,
        subtitle: Option<&Path>,
    ) -> Result<(), PlayerError> {
        let mut child = self.play(media, subtitle)?;
        let status = child.wait().await;
        debug!(?status, "Player exited");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands() {
        assert_eq!(PlayerType::Mpv.command(), "mpv");
        assert!(PlayerType::Vlc.command().to_lowercase().ends_with("vlc"));
        assert_eq!(PlayerType::Vlc.to_string(), "VLC");
    }

    #[test]
    fn test_default_player_is_mpv() {
        assert_eq!(PlayerType::default(), PlayerType::Mpv);
        assert_eq!(LocalPlayer::default().player_type(), PlayerType::Mpv);
    }

    #[test]
    fn test_mpv_args() {
        let args = PlayerType::Mpv.args(Path::new("/lib/a.mkv"), Some(Path::new("/lib/a.srt")));
        assert_eq!(args, vec![OsString::from("/lib/a.mkv"), OsString::from("--sub-file=/lib/a.srt")]);

        let args = PlayerType::Mpv.args(Path::new("/lib/a.mkv"), None);
        assert_eq!(args, vec![OsString::from("/lib/a.mkv")]);
    }

    #[test]
    fn test_vlc_args() {
        let args = PlayerType::Vlc.args(Path::new("/lib/a.mkv"), Some(Path::new("/lib/a.srt")));
        assert_eq!(
            args,
            vec![
                OsString::from("/lib/a.mkv"),
                OsString::from("--sub-file"),
                OsString::from("/lib/a.srt")
            ]
        );
    }

    #[test]
    fn test_player_type_from_config() {
        #[derive(Deserialize)]
        struct Wrapper {
            player: PlayerType,
        }
        let w: Wrapper = toml::from_str("player = \"vlc\"").unwrap();
        assert_eq!(w.player, PlayerType::Vlc);
    }

    #[tokio::test]
    async fn test_missing_player_is_reported() {
        let player = LocalPlayer::new(PlayerType::Mpv);
        if player.is_available().await {
            return;
        }
        let err = player.play(Path::new("/nonexistent.mkv"), None).unwrap_err();
        assert!(matches!(err, PlayerError::NotFound("mpv")));
    }
}
