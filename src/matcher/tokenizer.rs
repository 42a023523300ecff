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

/// Splits `path` on any character contained in `separators`.
///
/// Runs of separators never produce tokens of their own. With `trim_tokens`
/// every token loses leading and trailing characters `<= ' '`; with
/// `ignore_empty_tokens` tokens left empty by trimming are dropped.
pub fn tokenize(
    path: Option<&str>,
    separators: &str,
    trim_tokens: bool,
    ignore_empty_tokens: bool,
) -> Vec<String> {
    let Some(path) = path else {
        return Vec::new();
    };

    path.split(|c: char| separators.contains(c))
        .filter(|raw| !raw.is_empty())
        .map(|raw| {
            if trim_tokens {
                raw.trim_matches(|c: char| c <= ' ')
            } else {
                raw
            }
        })
        .filter(|token| !ignore_empty_tokens || !token.is_empty())
        .map(str::to_string)
        .collect()
}
