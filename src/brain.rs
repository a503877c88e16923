use std::collections::HashMap;

use ::rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config;

/// Neuron and synapse ids come from one shared counter so structure stays comparable
/// across the whole population.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct IdAllocator {
    next: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&mut self) -> u64 {
        let id = self.next;
        self.next += 1;
        id
    }

    /// Advance past every id used by `genotype`. Needed after loading a genome from disk.
    pub fn sync_with(&mut self, genotype: &Genotype) {
        if let Some(max) = genotype.max_id() {
            self.next = self.next.max(max + 1);
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NeuronKind {
    Input,
    Hidden,
    Output,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NeuronGene {
    pub id: u64,
    pub kind: NeuronKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SynapseGene {
    pub id: u64,
    pub from: u64,
    pub to: u64,
    pub weight: f32,
}

/// Feed-forward NEAT genome. `neurons` is kept in evaluation order: every synapse goes
/// from an earlier neuron to a later one, inputs first and outputs last.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Genotype {
    pub neurons: Vec<NeuronGene>,
    pub synapses: Vec<SynapseGene>,
}

impl Genotype {
    /// Fully disconnected network with the given IO widths.
    pub fn new(inputs: usize, outputs: usize, ids: &mut IdAllocator) -> Self {
        let mut neurons = Vec::with_capacity(inputs + outputs);
        for _ in 0..inputs {
            neurons.push(NeuronGene {
                id: ids.next(),
                kind: NeuronKind::Input,
            });
        }
        for _ in 0..outputs {
            neurons.push(NeuronGene {
                id: ids.next(),
                kind: NeuronKind::Output,
            });
        }
        Self {
            neurons,
            synapses: Vec::new(),
        }
    }

    pub fn input_count(&self) -> usize {
        self.count(NeuronKind::Input)
    }

    pub fn output_count(&self) -> usize {
        self.count(NeuronKind::Output)
    }

    pub fn hidden_count(&self) -> usize {
        self.count(NeuronKind::Hidden)
    }

    fn count(&self, kind: NeuronKind) -> usize {
        self.neurons.iter().filter(|n| n.kind == kind).count()
    }

    fn max_id(&self) -> Option<u64> {
        let neurons = self.neurons.iter().map(|n| n.id);
        let synapses = self.synapses.iter().map(|s| s.id);
        neurons.chain(synapses).max()
    }

    fn order_of(&self, id: u64) -> Option<usize> {
        self.neurons.iter().position(|n| n.id == id)
    }

    /// Nudge one random synapse weight by up to `size`.
    pub fn mutate_random_synapse(&mut self, size: f32, rng: &mut impl Rng) -> bool {
        if self.synapses.is_empty() || size <= 0.0 {
            return false;
        }
        let idx = rng.gen_range(0..self.synapses.len());
        self.synapses[idx].weight += rng.gen_range(-1.0f32..1.0) * size;
        true
    }

    /// Connect two unconnected neurons, keeping the network feed-forward.
    /// Gives up after a few failed picks on dense networks.
    pub fn add_random_synapse(
        &mut self,
        size: f32,
        ids: &mut IdAllocator,
        rng: &mut impl Rng,
    ) -> bool {
        let n = self.neurons.len();
        if n < 2 {
            return false;
        }
        for _ in 0..config::SYNAPSE_GROWTH_ATTEMPTS {
            let a = rng.gen_range(0..n);
            let b = rng.gen_range(0..n);
            let (from_idx, to_idx) = if a < b { (a, b) } else { (b, a) };
            if from_idx == to_idx {
                continue;
            }
            let from = &self.neurons[from_idx];
            let to = &self.neurons[to_idx];
            if from.kind == NeuronKind::Output || to.kind == NeuronKind::Input {
                continue;
            }
            let (from, to) = (from.id, to.id);
            if self.synapses.iter().any(|s| s.from == from && s.to == to) {
                continue;
            }
            self.synapses.push(SynapseGene {
                id: ids.next(),
                from,
                to,
                weight: rng.gen_range(-1.0f32..1.0) * size,
            });
            return true;
        }
        false
    }

    /// Split a random synapse with a new hidden neuron. The incoming half gets weight 1
    /// and the outgoing half keeps the old weight.
    pub fn add_random_neuron(&mut self, ids: &mut IdAllocator, rng: &mut impl Rng) -> bool {
        if self.synapses.is_empty() {
            return false;
        }
        let idx = rng.gen_range(0..self.synapses.len());
        let old = self.synapses.swap_remove(idx);
        let Some(to_order) = self.order_of(old.to) else {
            return false;
        };

        let neuron = NeuronGene {
            id: ids.next(),
            kind: NeuronKind::Hidden,
        };
        let hidden = neuron.id;
        self.neurons.insert(to_order, neuron);
        self.synapses.push(SynapseGene {
            id: ids.next(),
            from: old.from,
            to: hidden,
            weight: 1.0,
        });
        self.synapses.push(SynapseGene {
            id: ids.next(),
            from: hidden,
            to: old.to,
            weight: old.weight,
        });
        true
    }

    pub fn prune_random_synapse(&mut self, rng: &mut impl Rng) -> bool {
        if self.synapses.is_empty() {
            return false;
        }
        let idx = rng.gen_range(0..self.synapses.len());
        self.synapses.remove(idx);
        true
    }
}

/// Compiled, read-only form of a `Genotype`.
#[derive(Clone, Debug)]
pub struct Phenotype {
    kinds: Vec<NeuronKind>,
    /// Per neuron: (source slot, weight) pairs.
    incoming: Vec<Vec<(usize, f32)>>,
    inputs: usize,
    outputs: usize,
}

impl Phenotype {
    pub fn compile(genotype: &Genotype) -> Self {
        let slots: HashMap<u64, usize> = genotype
            .neurons
            .iter()
            .enumerate()
            .map(|(slot, n)| (n.id, slot))
            .collect();
        let mut incoming = vec![Vec::new(); genotype.neurons.len()];
        for synapse in &genotype.synapses {
            if let (Some(&from), Some(&to)) = (slots.get(&synapse.from), slots.get(&synapse.to)) {
                if from < to {
                    incoming[to].push((from, synapse.weight));
                }
            }
        }
        Self {
            kinds: genotype.neurons.iter().map(|n| n.kind).collect(),
            incoming,
            inputs: genotype.input_count(),
            outputs: genotype.output_count(),
        }
    }

    /// Evaluate the network. Missing inputs read as zero, extra ones are ignored.
    pub fn forward(&self, inputs: &[f32]) -> Vec<f32> {
        let inputs = &inputs[..inputs.len().min(self.inputs)];
        let mut values = vec![0.0f32; self.kinds.len()];
        let mut outputs = Vec::with_capacity(self.outputs);
        let mut input_slot = 0;
        for slot in 0..self.kinds.len() {
            match self.kinds[slot] {
                NeuronKind::Input => {
                    values[slot] = inputs.get(input_slot).copied().unwrap_or(0.0);
                    input_slot += 1;
                }
                kind => {
                    let sum: f32 = self.incoming[slot]
                        .iter()
                        .map(|&(from, w)| values[from] * w)
                        .sum();
                    values[slot] = if kind == NeuronKind::Hidden {
                        sigmoid(sum)
                    } else {
                        sum.tanh()
                    };
                    if kind == NeuronKind::Output {
                        outputs.push(values[slot]);
                    }
                }
            }
        }
        outputs
    }
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
