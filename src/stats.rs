//! Rolling population statistics, sampled every few ticks and logged periodically.

/// Ring buffer that stores the last N samples of a metric.
pub struct RingBuffer {
    data: Vec<f32>,
    head: usize,
    len: usize,
    capacity: usize,
}

impl RingBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            data: vec![0.0; capacity],
            head: 0,
            len: 0,
            capacity,
        }
    }

    pub fn push(&mut self, value: f32) {
        self.data[self.head] = value;
        self.head = (self.head + 1) % self.capacity;
        if self.len < self.capacity {
            self.len += 1;
        }
    }

    /// Samples in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        let start = if self.len < self.capacity {
            0
        } else {
            self.head
        };
        (0..self.len).map(move |i| self.data[(start + i) % self.capacity])
    }

    pub fn last(&self) -> Option<f32> {
        if self.len == 0 {
            None
        } else {
            let idx = (self.head + self.capacity - 1) % self.capacity;
            Some(self.data[idx])
        }
    }
}

/// One observation of the population, taken after a tick.
#[derive(Clone, Copy, Debug, Default)]
pub struct PopulationSample {
    pub population: usize,
    pub food_count: usize,
    pub mean_diet: f32,
    pub mean_size: f32,
    pub mean_generation: f32,
}

pub struct SimStats {
    pub population: RingBuffer,
    pub food_count: RingBuffer,
    pub mean_diet: RingBuffer,
    pub mean_size: RingBuffer,
    pub mean_generation: RingBuffer,
    pub births: RingBuffer,
    pub deaths: RingBuffer,

    // Accumulated between samples
    pub births_since_sample: u32,
    pub deaths_since_sample: u32,
    pub sample_interval: u32,
    pub tick_counter: u32,
}

impl SimStats {
    pub fn new(capacity: usize) -> Self {
        Self {
            population: RingBuffer::new(capacity),
            food_count: RingBuffer::new(capacity),
            mean_diet: RingBuffer::new(capacity),
            mean_size: RingBuffer::new(capacity),
            mean_generation: RingBuffer::new(capacity),
            births: RingBuffer::new(capacity),
            deaths: RingBuffer::new(capacity),
            births_since_sample: 0,
            deaths_since_sample: 0,
            sample_interval: crate::config::STATS_SAMPLE_INTERVAL,
            tick_counter: 0,
        }
    }

    /// Count this tick's births and deaths; every `sample_interval` ticks push a sample.
    pub fn record(&mut self, sample: PopulationSample, births: u32, deaths: u32) {
        self.births_since_sample += births;
        self.deaths_since_sample += deaths;

        self.tick_counter += 1;
        if self.tick_counter % self.sample_interval.max(1) != 0 {
            return;
        }

        self.population.push(sample.population as f32);
        self.food_count.push(sample.food_count as f32);
        self.mean_diet.push(sample.mean_diet);
        self.mean_size.push(sample.mean_size);
        self.mean_generation.push(sample.mean_generation);
        self.births.push(self.births_since_sample as f32);
        self.deaths.push(self.deaths_since_sample as f32);

        self.births_since_sample = 0;
        self.deaths_since_sample = 0;
    }

    /// One-line summary for the periodic log.
    pub fn summary(&self) -> String {
        let births: f32 = self.births.iter().sum();
        let deaths: f32 = self.deaths.iter().sum();
        format!(
            "population {:.0}, food {:.0}, diet {:.2}, size {:.2}, generation {:.1}, births {:.0}, deaths {:.0}",
            self.population.last().unwrap_or(0.0),
            self.food_count.last().unwrap_or(0.0),
            self.mean_diet.last().unwrap_or(0.0),
            self.mean_size.last().unwrap_or(0.0),
            self.mean_generation.last().unwrap_or(0.0),
            births,
            deaths,
        )
    }
}
