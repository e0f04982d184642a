// SPDX-License-Identifier: MIT
// Username/password wordlist ingestion and the credential cross-product.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::ScanError;
use crate::model::Credential;

/// Reads `arg` as a file (one entry per non-empty trimmed line) if it exists
/// on disk, otherwise treats `arg` itself as the single literal value.
pub async fn parse_file_by_line(arg: &str) -> Result<Vec<String>, ScanError> {
    if tokio::fs::metadata(arg).await.is_ok() {
        let content = tokio::fs::read_to_string(arg).await.map_err(ScanError::from)?;
        let values: Vec<String> = content
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        if values.is_empty() {
            return Err(ScanError::Config(format!("{arg}: file contains no entries")));
        }
        Ok(values)
    } else {
        Ok(vec![arg.to_string()])
    }
}

/// Streams the password-outer, username-inner credential cross-product
/// straight into `tx`, one credential at a time, matching the source tool's
/// generator-goroutine feed. The product is never materialized as a whole:
/// only the single `Credential` in flight and the two wordlists themselves
/// are held in memory, and nothing is retained once a credential is sent.
pub async fn stream_cross_product(
    usernames: &[String],
    passwords: &[String],
    tx: &mpsc::Sender<Credential>,
    ctx: &CancellationToken,
) {
    for password in passwords {
        for username in usernames {
            if ctx.is_cancelled() {
                return;
            }
            let credential = Credential {
                username: username.clone(),
                password: password.clone(),
            };
            if tx.send(credential).await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn literal_arg_yields_single_value() {
        let v = parse_file_by_line("admin").await.unwrap();
        assert_eq!(v, vec!["admin".to_string()]);
    }

    #[tokio::test]
    async fn file_arg_yields_trimmed_nonempty_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.txt");
        tokio::fs::write(&path, "admin\n  root  \n\nguest\n").await.unwrap();
        let v = parse_file_by_line(path.to_str().unwrap()).await.unwrap();
        assert_eq!(v, vec!["admin", "root", "guest"]);
    }

    #[tokio::test]
    async fn stream_cross_product_iterates_password_outer() {
        let users = vec!["admin".to_string(), "root".to_string()];
        let passes = vec!["pw1".to_string(), "pw2".to_string()];
        let (tx, mut rx) = mpsc::channel(8);
        let ctx = CancellationToken::new();
        stream_cross_product(&users, &passes, &tx, &ctx).await;
        drop(tx);

        let mut creds = Vec::new();
        while let Some(c) = rx.recv().await {
            creds.push(c);
        }
        assert_eq!(creds.len(), 4);
        assert_eq!(creds[0].password, "pw1");
        assert_eq!(creds[0].username, "admin");
        assert_eq!(creds[1].username, "root");
        assert_eq!(creds[2].password, "pw2");
    }

    #[tokio::test]
    async fn stream_cross_product_stops_once_cancelled() {
        let users = vec!["admin".to_string()];
        let passes = vec!["pw1".to_string(), "pw2".to_string(), "pw3".to_string()];
        let (tx, mut rx) = mpsc::channel(1);
        let ctx = CancellationToken::new();
        ctx.cancel();
        stream_cross_product(&users, &passes, &tx, &ctx).await;
        drop(tx);

        let mut creds = Vec::new();
        while let Some(c) = rx.recv().await {
            creds.push(c);
        }
        assert!(creds.is_empty());
    }
}
