/*
 * Copyright 2026 ReMock Team
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use anyhow::Context;
use clap::{Parser, Subcommand};
use remock::config::{ConfigLoader, TelemetryConfig};
use remock::interceptor::{InterceptedRequest, InterceptedResponse, Interceptor, ReqwestTransport};
use remock::matcher::{AntPathMatcher, PathMatcher};
use remock::telemetry::{init_telemetry, shutdown_telemetry};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send one request through the interceptor
    Request {
        #[arg(short, long, default_value = "config/remock-config.yaml")]
        config: PathBuf,

        /// Request header as `Name: value`, repeatable
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        #[arg(short, long)]
        data: Option<String>,

        #[arg(long, default_value = "application/json")]
        content_type: String,

        /// Network timeout in seconds when no mock applies
        #[arg(long, default_value_t = 30)]
        timeout: u64,

        method: String,

        url: String,
    },
    /// Match a path against a pattern and print what was captured
    Match {
        /// Prefix match instead of a full match
        #[arg(long)]
        start: bool,

        #[arg(long, default_value = "/")]
        separator: String,

        pattern: String,

        path: String,
    },
    /// Load and validate a configuration file
    Validate {
        #[arg(short, long, default_value = "config/remock-config.yaml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Request {
            config,
            headers,
            data,
            content_type,
            timeout,
            method,
            url,
        } => {
            let config = ConfigLoader::from_file(&config)
                .with_context(|| format!("Failed to load config from {:?}", config))?;
            init_telemetry(&config.telemetry).await?;

            let request = build_request(&method, &url, &headers, data, &content_type)?;
            let store = Arc::new(config.build_store()?);
            let interceptor = Interceptor::builder(store)
                .matcher(Arc::new(config.matcher.build()))
                .build();
            let transport = ReqwestTransport::new(Duration::from_secs(timeout))?;

            let result = interceptor.intercept(request, &transport).await;
            shutdown_telemetry().await;
            print_response(&result?);
        }
        Command::Match {
            start,
            separator,
            pattern,
            path,
        } => {
            init_telemetry(&TelemetryConfig::default()).await?;
            let matcher = AntPathMatcher::with_separator(separator);
            let matched = if start {
                matcher.match_start(&pattern, &path)
            } else {
                matcher.matches(&pattern, &path)
            };

            println!("matched: {matched}");
            if matched && !start {
                println!(
                    "path within pattern: {}",
                    matcher.extract_path_within_pattern(&pattern, &path)
                );
                let variables = matcher.extract_uri_template_variables(&pattern, &path)?;
                for (name, value) in variables.iter() {
                    println!("  {name} = {value}");
                }
            }
        }
        Command::Validate { config } => {
            init_telemetry(&TelemetryConfig::default()).await?;
            let loaded = ConfigLoader::from_file(&config)
                .with_context(|| format!("Invalid config {:?}", config))?;
            let responses: usize = loaded.rules.iter().map(|r| r.responses.len()).sum();
            info!(rules = loaded.rules.len(), responses, "Configuration is valid");
            println!(
                "{}: {} rules, {} responses",
                config.display(),
                loaded.rules.len(),
                responses
            );
        }
    }

    Ok(())
}

fn build_request(
    method: &str,
    url: &str,
    headers: &[String],
    data: Option<String>,
    content_type: &str,
) -> anyhow::Result<InterceptedRequest> {
    let method = http::Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("Invalid HTTP method: {method}"))?;
    let url = url::Url::parse(url).with_context(|| format!("Invalid URL: {url}"))?;

    let mut request = InterceptedRequest::new(method, url);
    for header in headers {
        let (name, value) = header
            .split_once(':')
            .with_context(|| format!("Header must look like `Name: value`: {header}"))?;
        request = request.with_header(name.trim(), value.trim());
    }
    if let Some(data) = data {
        let mime: mime::Mime = content_type
            .parse()
            .with_context(|| format!("Invalid content type: {content_type}"))?;
        request = request
            .with_header("Content-Type", content_type)
            .with_body(data, Some(mime));
    }
    Ok(request)
}

fn print_response(response: &InterceptedResponse) {
    println!(
        "{:?} {} {}",
        response.version,
        response.status.as_u16(),
        response.reason()
    );
    for (name, value) in &response.headers {
        println!("{name}: {value}");
    }
    if let Some(body) = &response.body {
        println!();
        println!("{}", body.text());
    }
}
