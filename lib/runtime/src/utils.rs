// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

pub use tokio::time::{Duration, Instant};

pub mod stream;

pub use stream::{DeadlineStream, Interrupt, until_deadline, until_deadline_or_cancelled};
