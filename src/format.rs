// SPDX-FileCopyrightText: 2025 stfnw
// SPDX-License-Identifier: MIT

/// Debug rendering with de Bruijn indices, used for trace output.
pub mod debruijn;
/// Program text with named variables.
pub mod named;
