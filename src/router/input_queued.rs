/*!

An input queued router with virtual channels and credit based flow control.

The flits are stored at the input ports. A packet walks the stages

* input queuing, where the flits received in the cycle enter their virtual channel;
* routing, computing the candidate outputs of the head flit (skipped with lookahead routing, `routing_delay=0`);
* virtual channel allocation, binding the packet to a downstream virtual channel (skipped with `vc_allocator="piggyback"`);
* switch allocation, granting a crossbar connection to the front flit of a virtual channel;
* switch traversal, moving the flit into the queue of its output port.

Each stage keeps a [DelayQueue] of items. In every cycle all stages are first evaluated, computing the outcome of their items against the state at the beginning of the cycle, and then updated,
committing the outcomes of the items already ready. Items that could not advance are queued again, counting the reason as a [Stall].

With `speculative`, virtual channels still in VC allocation also request the switch, either in the same allocator with their priority lowered or in `spec_sw_allocator`.
A flit granted both allocations in the same cycle advances one cycle earlier.

*/

use std::rc::Rc;
use std::cell::RefCell;
use std::collections::{BTreeMap,VecDeque};

use rand::rngs::StdRng;
use quantifiable_derive::Quantifiable;//the derive macro
use crate::allocator::{Allocator,AllocatorBuilderArgument,Request,new_allocator};
use crate::arbiter::round_robin::supersedes;
use crate::buffer::{Buffer,VcState,VirtualChannel};
use crate::buffer_state::BufferState;
use crate::channel::{FlitChannel,CreditChannel};
use crate::config::RouterConfiguration;
use crate::config_parser::ConfigurationValue;
use crate::delay_queue::DelayQueue;
use crate::error::Error;
use crate::flit::{Flit,Credit};
use crate::route::RouteCandidate;
use crate::routing::{RouterInfo,RoutingFunction};
use crate::simulation::SimulationContext;
use crate::source_location;
use crate::{Plugs,Time};
use super::{Router,RouterBuilderArgument,RouterStatistics,Stall};

/// What the evaluation of a stage decided for an item.
#[derive(Clone,Copy,Debug,PartialEq,Eq)]
enum Outcome
{
	Undecided,
	///The granted resource: an `output*vcs+vc` in VC allocation, an expanded output in switch allocation.
	Granted(usize),
	Stalled(Stall),
}

/// A virtual channel of an input port waiting in a stage.
#[derive(Clone,Copy,Debug,PartialEq,Eq)]
struct StageItem
{
	input: usize,
	vc: usize,
	outcome: Outcome,
}

quantifiable_simple!(StageItem);

impl StageItem
{
	fn new(input:usize, vc:usize) -> StageItem
	{
		StageItem{input,vc,outcome:Outcome::Undecided}
	}
}

/// A flit crossing the switch.
#[derive(Clone,Debug,Quantifiable)]
struct CrossbarItem
{
	flit: Flit,
	expanded_input: usize,
	expanded_output: usize,
}

/// The downstream virtual channels precomputed for a packet with NOQ.
#[derive(Clone,Copy,Debug,PartialEq,Eq)]
struct NoqRange
{
	port: usize,
	vc_start: usize,
	vc_end: usize,
}

quantifiable_simple!(NoqRange);

/// The input of the VC allocator used by a virtual channel of an input.
fn vc_request_input(shuffle:bool, inputs:usize, vcs:usize, input:usize, vc:usize) -> usize
{
	if shuffle { vc*inputs + input } else { input*vcs + vc }
}

/// The virtual channels of a candidate that a packet may use.
fn candidate_range(noq:&Option<NoqRange>, candidate:&RouteCandidate) -> (usize,usize)
{
	match noq
	{
		Some(range) => (range.vc_start,range.vc_end),
		None => (candidate.vc_start,candidate.vc_end),
	}
}

/// The stall of a flit that cannot enter a downstream virtual channel without space.
fn full_stall(dest:&BufferState) -> Stall
{
	if dest.is_full() { Stall::BufferFull } else { Stall::BufferReserved }
}

/// The cycle in which an item evaluated at `now` completes a stage of `delay` cycles.
fn stage_ready(now:Time, delay:Time) -> Time
{
	(now+delay).saturating_sub(1)
}

fn assigned_output(buffer:&Buffer, vc:usize) -> Result<(usize,usize),Error>
{
	buffer.vc(vc).output().ok_or_else(||Error::undetermined(source_location!()).with_message(format!("virtual channel {} is active without an output",vc)))
}

fn build_allocator(name:&str, num_inputs:usize, num_outputs:usize, config:&RouterConfiguration, plugs:&Plugs) -> Result<Box<dyn Allocator>,Error>
{
	new_allocator(AllocatorBuilderArgument{
		name,
		num_inputs,
		num_outputs,
		iterations: config.alloc_iters,
		arbiter: &config.arb_type,
		plugs,
	})
}

/**
An input queued router. See the module documentation for the pipeline.

```ignore
IQRouter
{
	num_vcs: 4,
	buf_size: 16,
	vc_allocator: "islip",
	sw_allocator: "separable_input_first(round_robin)",
	speculative: true,
	hold_switch_for_packet: true,
}
```
**/
#[derive(Quantifiable)]
pub struct InputQueued
{
	info: RouterInfo,
	config: RouterConfiguration,
	///Nominal delays. The delays of each item are sampled from the [DelayConfig](crate::delay::DelayConfig).
	routing_delay: Time,
	vc_alloc_delay: Time,
	sw_alloc_delay: Time,
	routing: Rc<dyn RoutingFunction>,
	buffers: Vec<Buffer>,
	///The state of the buffer at the other side of each output.
	next_buffers: Vec<BufferState>,
	///`None` when the VC allocation is piggybacked on the switch allocation.
	vc_allocator: Option<Box<dyn Allocator>>,
	sw_allocator: Box<dyn Allocator>,
	spec_sw_allocator: Option<Box<dyn Allocator>>,
	///Round robin offsets of the piggybacked VC allocation, per output and class.
	vc_rr_offset: Vec<usize>,
	///Round robin offsets among the virtual channels of each expanded input.
	sw_rr_offset: Vec<usize>,
	noq_next: Vec<Vec<Option<NoqRange>>>,
	///Expanded output held by each expanded input.
	switch_hold_in: Vec<Option<usize>>,
	///Virtual channel holding each expanded input.
	switch_hold_vc: Vec<Option<usize>>,
	///Expanded input holding each expanded output.
	switch_hold_out: Vec<Option<usize>>,
	input_channels: Vec<Option<Rc<RefCell<FlitChannel>>>>,
	input_credit_channels: Vec<Option<Rc<RefCell<CreditChannel>>>>,
	output_channels: Vec<Option<Rc<RefCell<FlitChannel>>>>,
	output_credit_channels: Vec<Option<Rc<RefCell<CreditChannel>>>>,
	///Flits received in this cycle, by input.
	in_queue_flits: BTreeMap<usize,Flit>,
	///Received credits with their output, waiting for the credit delay.
	proc_credits: DelayQueue<(Credit,usize)>,
	route_vcs: DelayQueue<StageItem>,
	vc_alloc_vcs: DelayQueue<StageItem>,
	sw_hold_vcs: DelayQueue<StageItem>,
	sw_alloc_vcs: DelayQueue<StageItem>,
	crossbar_flits: DelayQueue<CrossbarItem>,
	output_buffers: Vec<VecDeque<Flit>>,
	credit_buffers: Vec<VecDeque<Credit>>,
	///Credits of the flits leaving the input buffers in this cycle, by input.
	out_queue_credits: BTreeMap<usize,Credit>,
	active: bool,
	statistics: RouterStatistics,
}

impl InputQueued
{
	pub fn new(arg:RouterBuilderArgument) -> Result<InputQueued,Error>
	{
		let config = RouterConfiguration::from_cv(arg.cv);
		let index = arg.router_index;
		let inputs = arg.inputs;
		let outputs = arg.outputs;
		let vcs = config.num_vcs;
		let nominal = arg.delays.router(index)?;
		let routing_delay = nominal.routing.mean;
		let vc_alloc_delay = nominal.vc_alloc.mean;
		let sw_alloc_delay = nominal.sw_alloc.mean;
		if vc_alloc_delay==0
		{
			return Err(Error::zero_delay(source_location!(),"vc_alloc"));
		}
		if sw_alloc_delay==0
		{
			return Err(Error::zero_delay(source_location!(),"sw_alloc"));
		}
		let (vc_allocator,vc_rr_offset) = if config.vc_allocator=="piggyback"
		{
			if !config.speculative
			{
				return Err(Error::incompatible_configuration(source_location!()).with_message("piggybacked VC allocation requires speculative switch allocation".to_string()));
			}
			(None,vec![vcs.saturating_sub(1);outputs*config.classes])
		}
		else
		{
			(Some(build_allocator(&config.vc_allocator,inputs*vcs,outputs*vcs,&config,arg.plugs)?),vec![])
		};
		let expanded_inputs = inputs*config.input_speedup;
		let expanded_outputs = outputs*config.output_speedup;
		let sw_allocator = build_allocator(&config.sw_allocator,expanded_inputs,expanded_outputs,&config,arg.plugs)?;
		let spec_sw_allocator = if config.speculative && config.spec_sw_allocator!="prio"
		{
			Some(build_allocator(&config.spec_sw_allocator,expanded_inputs,expanded_outputs,&config,arg.plugs)?)
		}
		else
		{
			None
		};
		if config.noq
		{
			if routing_delay>0
			{
				return Err(Error::incompatible_configuration(source_location!()).with_message("NOQ requires lookahead routing".to_string()));
			}
			if vcs<outputs
			{
				return Err(Error::incompatible_configuration(source_location!()).with_message(format!("NOQ requires at least as many virtual channels ({}) as outputs ({})",vcs,outputs)));
			}
		}
		let next_buffers = (0..outputs).map(|_|BufferState::new(&config)).collect::<Result<Vec<BufferState>,Error>>()?;
		log::info!("router {} built with {} inputs, {} outputs, {} virtual channels, {} policy and {} speculation",index,inputs,outputs,vcs,config.buffer_policy,if config.speculative {"with"} else {"without"});
		Ok(InputQueued{
			info: RouterInfo{index,inputs,outputs},
			routing_delay,
			vc_alloc_delay,
			sw_alloc_delay,
			routing: arg.routing,
			buffers: (0..inputs).map(|_|Buffer::new(&config)).collect(),
			next_buffers,
			vc_allocator,
			sw_allocator,
			spec_sw_allocator,
			vc_rr_offset,
			sw_rr_offset: (0..expanded_inputs).map(|i|i%config.input_speedup).collect(),
			noq_next: vec![vec![None;vcs];inputs],
			switch_hold_in: vec![None;expanded_inputs],
			switch_hold_vc: vec![None;expanded_inputs],
			switch_hold_out: vec![None;expanded_outputs],
			input_channels: vec![None;inputs],
			input_credit_channels: vec![None;inputs],
			output_channels: vec![None;outputs],
			output_credit_channels: vec![None;outputs],
			in_queue_flits: BTreeMap::new(),
			proc_credits: DelayQueue::new(),
			route_vcs: DelayQueue::new(),
			vc_alloc_vcs: DelayQueue::new(),
			sw_hold_vcs: DelayQueue::new(),
			sw_alloc_vcs: DelayQueue::new(),
			crossbar_flits: DelayQueue::new(),
			output_buffers: vec![VecDeque::new();outputs],
			credit_buffers: vec![VecDeque::new();inputs],
			out_queue_credits: BTreeMap::new(),
			active: false,
			statistics: RouterStatistics::new(0),
			config,
		})
	}
	pub fn virtual_channel(&self, input:usize, vc:usize) -> &VirtualChannel
	{
		self.buffers[input].vc(vc)
	}
	///The view of the buffer at the other side of `output`.
	pub fn next_buffer(&self, output:usize) -> &BufferState
	{
		&self.next_buffers[output]
	}
	pub fn configuration(&self) -> &RouterConfiguration
	{
		&self.config
	}
	fn expanded_input(&self, input:usize, vc:usize) -> usize
	{
		input*self.config.input_speedup + vc%self.config.input_speedup
	}
	fn expanded_output(&self, input:usize, output:usize) -> usize
	{
		output*self.config.output_speedup + input%self.config.output_speedup
	}
	///Whether the queue of `output` accepts another flit.
	fn output_has_room(&self, output:usize) -> bool
	{
		match self.config.output_buffer_size
		{
			Some(size) => self.output_buffers[output].len() < size,
			None => true,
		}
	}
	fn release_switch_hold(&mut self, expanded_input:usize)
	{
		self.switch_hold_vc[expanded_input]=None;
		if let Some(expanded_output)=self.switch_hold_in[expanded_input].take()
		{
			self.switch_hold_out[expanded_output]=None;
		}
	}
	///Send the packet at the front of a virtual channel to routing, or directly to allocation when its route came with it.
	fn start_packet(&mut self, input:usize, vc:usize, rng:&mut StdRng) -> Result<(),Error>
	{
		if self.routing_delay>0
		{
			self.buffers[input].set_state(vc,VcState::Routing)?;
			self.route_vcs.push_unscheduled(StageItem::new(input,vc));
			return Ok(());
		}
		let route_set = self.buffers[input].front_flit(vc).map(|flit|flit.lookahead_route.clone()).unwrap_or_default();
		self.buffers[input].vc_mut(vc).set_route_set(route_set);
		self.buffers[input].set_state(vc,VcState::VcAlloc)?;
		if self.config.speculative
		{
			self.sw_alloc_vcs.push_unscheduled(StageItem::new(input,vc));
		}
		if self.vc_allocator.is_some()
		{
			self.vc_alloc_vcs.push_unscheduled(StageItem::new(input,vc));
		}
		if self.config.noq
		{
			self.update_noq(input,vc,rng);
		}
		Ok(())
	}
	///Choose the downstream virtual channels of the packet at the front of `vc` so that they lead to the output it will take at the next router.
	fn update_noq(&mut self, input:usize, vc:usize, rng:&mut StdRng)
	{
		let flit = match self.buffers[input].front_flit(vc)
		{
			Some(flit) => flit,
			None => return,
		};
		let out_port = match flit.lookahead_route.candidates().first()
		{
			Some(candidate) => candidate.output_port,
			None => return,
		};
		let sink = match self.output_channels.get(out_port).and_then(|channel|channel.as_ref()).and_then(|channel|channel.borrow().sink())
		{
			Some(sink) => sink,
			None => return,
		};
		let mut next_flit = flit.clone();
		next_flit.hops+=1;
		let next_set = self.routing.route(&sink.router,&mut next_flit,sink.port,false,rng);
		if let Some(next) = next_set.candidates().first()
		{
			let count = (next.vc_end-next.vc_start+1)/sink.router.outputs;
			if count==0
			{
				log::warn!("router {} cannot divide {} virtual channels among the {} outputs of router {}",self.info.index,next.vc_end-next.vc_start+1,sink.router.outputs,sink.router.index);
				return;
			}
			self.noq_next[input][vc]=Some(NoqRange{
				port: next.output_port,
				vc_start: next.vc_start + next.output_port*count,
				vc_end: next.vc_start + (next.output_port+1)*count - 1,
			});
		}
	}
	fn input_queuing(&mut self, context:&mut SimulationContext) -> Result<(),Error>
	{
		let now = context.cycle;
		let in_queue = std::mem::take(&mut self.in_queue_flits);
		for (input,flit) in in_queue
		{
			let vc = flit.vc;
			self.buffers[input].add_flit(vc,flit,now)?;
			match self.buffers[input].state(vc)
			{
				VcState::Idle => self.start_packet(input,vc,&mut context.rng)?,
				VcState::Active if self.buffers[input].vc(vc).occupancy()==1 =>
				{
					let expanded_input = self.expanded_input(input,vc);
					if self.switch_hold_vc[expanded_input]==Some(vc)
					{
						self.sw_hold_vcs.push_unscheduled(StageItem::new(input,vc));
					}
					else
					{
						self.sw_alloc_vcs.push_unscheduled(StageItem::new(input,vc));
					}
				},
				_ => (),
			}
		}
		while let Some((credit,output)) = self.proc_credits.pop_ready(now)
		{
			self.next_buffers[output].process_credit(&credit,now)?;
			context.credits.release(credit);
		}
		Ok(())
	}
	fn route_evaluate(&mut self, context:&mut SimulationContext) -> Result<(),Error>
	{
		let now = context.cycle;
		let pending = self.route_vcs.unscheduled_len();
		for slot in self.route_vcs.iter_mut().take(pending)
		{
			slot.ready = Some(stage_ready(now,context.delays.routing_delay(self.info.index)?));
		}
		Ok(())
	}
	fn route_update(&mut self, context:&mut SimulationContext) -> Result<(),Error>
	{
		while let Some(item) = self.route_vcs.pop_ready(context.cycle)
		{
			let (input,vc) = (item.input,item.vc);
			self.buffers[input].vc_mut(vc).route(&*self.routing,&self.info,input,&mut context.rng);
			self.buffers[input].set_state(vc,VcState::VcAlloc)?;
			if self.config.speculative
			{
				self.sw_alloc_vcs.push_unscheduled(StageItem::new(input,vc));
			}
			if self.vc_allocator.is_some()
			{
				self.vc_alloc_vcs.push_unscheduled(StageItem::new(input,vc));
			}
		}
		Ok(())
	}
	fn vc_alloc_evaluate(&mut self, context:&mut SimulationContext) -> Result<(),Error>
	{
		let now = context.cycle;
		let vcs = self.config.num_vcs;
		let inputs = self.info.inputs;
		let shuffle = self.config.vc_shuffle_requests;
		let busy_when_full = self.config.vc_busy_when_full;
		let prioritize_empty = self.config.vc_prioritize_empty;
		let allocator = match self.vc_allocator
		{
			Some(ref mut allocator) => allocator,
			None => return Ok(()),
		};
		let pending = self.vc_alloc_vcs.unscheduled_len();
		for slot in self.vc_alloc_vcs.iter_mut().take(pending)
		{
			let (input,vc) = (slot.item.input,slot.item.vc);
			let virtual_channel = self.buffers[input].vc(vc);
			let out_priority = virtual_channel.priority();
			let request_input = vc_request_input(shuffle,inputs,vcs,input,vc);
			let mut elig = false;
			let mut cred = false;
			let mut reserved = false;
			for candidate in virtual_channel.route_set().candidates()
			{
				let out_port = candidate.output_port;
				let dest = &self.next_buffers[out_port];
				let (vc_start,vc_end) = candidate_range(&self.noq_next[input][vc],candidate);
				for out_vc in vc_start..=vc_end
				{
					let mut in_priority = candidate.priority;
					if prioritize_empty && !dest.is_empty_for(out_vc)
					{
						in_priority = in_priority.saturating_add(i64::MIN);
					}
					if !dest.is_available_for(out_vc)
					{
						continue;
					}
					elig = true;
					if busy_when_full && dest.is_full_for(out_vc,now)
					{
						reserved |= !dest.is_full();
					}
					else
					{
						cred = true;
						let output = out_port*vcs + out_vc;
						if allocator.read_request(request_input,output).is_none()
						{
							allocator.add_request(Request::new(request_input,output,0,in_priority,out_priority))?;
						}
					}
				}
			}
			if !elig
			{
				slot.item.outcome = Outcome::Stalled(Stall::BufferBusy);
			}
			else if busy_when_full && !cred
			{
				slot.item.outcome = Outcome::Stalled(if reserved {Stall::BufferReserved} else {Stall::BufferFull});
			}
		}
		allocator.allocate();
		for slot in self.vc_alloc_vcs.iter_mut().take(pending)
		{
			slot.ready = Some(stage_ready(now,context.delays.vc_alloc_delay(self.info.index)?));
			if let Outcome::Stalled(_) = slot.item.outcome
			{
				continue;
			}
			let request_input = vc_request_input(shuffle,inputs,vcs,slot.item.input,slot.item.vc);
			slot.item.outcome = match allocator.output_assigned(request_input)
			{
				Some(output_and_vc) => Outcome::Granted(output_and_vc),
				None => Outcome::Stalled(Stall::BufferConflict),
			};
		}
		if self.vc_alloc_delay<=1
		{
			return Ok(());
		}
		//The grants completing now may have lost their virtual channel while waiting.
		let ready = self.vc_alloc_vcs.ready_len(now);
		for slot in self.vc_alloc_vcs.iter_mut().take(ready)
		{
			if let Outcome::Granted(output_and_vc) = slot.item.outcome
			{
				let dest = &self.next_buffers[output_and_vc/vcs];
				let match_vc = output_and_vc%vcs;
				if !dest.is_available_for(match_vc)
				{
					slot.item.outcome = Outcome::Stalled(Stall::BufferBusy);
				}
				else if busy_when_full && dest.is_full_for(match_vc,now)
				{
					slot.item.outcome = Outcome::Stalled(full_stall(dest));
				}
			}
		}
		Ok(())
	}
	fn vc_alloc_update(&mut self, context:&mut SimulationContext) -> Result<(),Error>
	{
		let vcs = self.config.num_vcs;
		while let Some(item) = self.vc_alloc_vcs.pop_ready(context.cycle)
		{
			let (input,vc) = (item.input,item.vc);
			match item.outcome
			{
				Outcome::Granted(output_and_vc) =>
				{
					let (match_output,match_vc) = (output_and_vc/vcs,output_and_vc%vcs);
					self.next_buffers[match_output].take_buffer(match_vc,input*vcs+vc)?;
					self.buffers[input].vc_mut(vc).set_output(match_output,match_vc);
					self.buffers[input].set_state(vc,VcState::Active)?;
					self.statistics.vc_grants+=1;
					if self.buffers[input].front_flit(vc).map(|flit|flit.watch).unwrap_or(false)
					{
						log::debug!("router {} granted output {} vc {} to input {} vc {} at cycle {}",self.info.index,match_output,match_vc,input,vc,context.cycle);
					}
					if !self.config.speculative
					{
						self.sw_alloc_vcs.push_unscheduled(StageItem::new(input,vc));
					}
				},
				outcome =>
				{
					if let Outcome::Stalled(stall) = outcome
					{
						self.statistics.count_stall(stall);
					}
					self.vc_alloc_vcs.push_unscheduled(StageItem::new(input,vc));
				},
			}
		}
		Ok(())
	}
	fn sw_hold_evaluate(&mut self, context:&mut SimulationContext) -> Result<(),Error>
	{
		let now = context.cycle;
		let output_speedup = self.config.output_speedup;
		let pending = self.sw_hold_vcs.unscheduled_len();
		for slot in self.sw_hold_vcs.iter_mut().take(pending)
		{
			slot.ready = Some(now);
			let (input,vc) = (slot.item.input,slot.item.vc);
			let (match_port,match_vc) = assigned_output(&self.buffers[input],vc)?;
			let dest = &self.next_buffers[match_port];
			slot.item.outcome = if dest.is_full_for(match_vc,now)
			{
				Outcome::Stalled(full_stall(dest))
			}
			else
			{
				Outcome::Granted(match_port*output_speedup + input%output_speedup)
			};
		}
		Ok(())
	}
	fn sw_hold_update(&mut self, context:&mut SimulationContext) -> Result<(),Error>
	{
		while let Some(item) = self.sw_hold_vcs.pop_ready(context.cycle)
		{
			let (input,vc) = (item.input,item.vc);
			let expanded_input = self.expanded_input(input,vc);
			match item.outcome
			{
				Outcome::Granted(expanded_output) if self.output_has_room(expanded_output/self.config.output_speedup) =>
				{
					let output = expanded_output/self.config.output_speedup;
					let (_,match_vc) = assigned_output(&self.buffers[input],vc)?;
					let tail = self.traverse(input,vc,output,match_vc,expanded_input,expanded_output,context)?;
					if self.buffers[input].vc(vc).is_empty()
					{
						self.release_switch_hold(expanded_input);
						if tail
						{
							self.buffers[input].set_state(vc,VcState::Idle)?;
						}
					}
					else if tail
					{
						self.release_switch_hold(expanded_input);
						self.start_packet(input,vc,&mut context.rng)?;
					}
					else
					{
						self.sw_hold_vcs.push_unscheduled(StageItem::new(input,vc));
					}
				},
				outcome =>
				{
					if let Outcome::Stalled(stall) = outcome
					{
						self.statistics.count_stall(stall);
					}
					self.release_switch_hold(expanded_input);
					self.sw_alloc_vcs.push_unscheduled(StageItem::new(input,vc));
				},
			}
		}
		Ok(())
	}
	///Request the switch from `input`,`vc` to `output`. At most one virtual channel of an expanded input can request an expanded output; the one superseding the others in round robin order stays.
	///Returns whether the request was placed.
	fn sw_alloc_add_request(&mut self, input:usize, vc:usize, output:usize) -> Result<bool,Error>
	{
		let vcs = self.config.num_vcs;
		let expanded_input = self.expanded_input(input,vc);
		let expanded_output = self.expanded_output(input,output);
		if self.switch_hold_in[expanded_input].is_some() || self.switch_hold_out[expanded_output].is_some()
		{
			return Ok(false);
		}
		let virtual_channel = self.buffers[input].vc(vc);
		let mut priority = virtual_channel.priority();
		let speculative_request = self.config.speculative && virtual_channel.state()==VcState::VcAlloc;
		let allocator = match (speculative_request,self.spec_sw_allocator.as_mut())
		{
			(true,Some(spec_allocator)) => spec_allocator,
			(true,None) =>
			{
				priority = priority.saturating_add(i64::MIN);
				&mut self.sw_allocator
			},
			(false,_) => &mut self.sw_allocator,
		};
		if let Some(request) = allocator.read_request(expanded_input,expanded_output)
		{
			if !supersedes(vc,priority,request.label,request.in_priority,self.sw_rr_offset[expanded_input],vcs)
			{
				return Ok(false);
			}
			allocator.remove_request(expanded_input,expanded_output);
		}
		allocator.add_request(Request::new(expanded_input,expanded_output,vc,priority,priority))?;
		Ok(true)
	}
	fn sw_alloc_evaluate(&mut self, context:&mut SimulationContext) -> Result<(),Error>
	{
		let now = context.cycle;
		let vcs = self.config.num_vcs;
		let inputs = self.info.inputs;
		let input_speedup = self.config.input_speedup;
		let output_speedup = self.config.output_speedup;
		let speculative = self.config.speculative;
		let spec_check_elig = self.config.spec_check_elig;
		let spec_check_cred = self.config.spec_check_cred;
		let spec_mask_by_reqs = self.config.spec_mask_by_reqs;
		let pending = self.sw_alloc_vcs.unscheduled_len();
		let items : Vec<(usize,usize)> = self.sw_alloc_vcs.iter().take(pending).map(|slot|(slot.item.input,slot.item.vc)).collect();
		let mut stalls : Vec<Option<Stall>> = vec![None;pending];
		for (index,&(input,vc)) in items.iter().enumerate()
		{
			let watched = self.buffers[input].front_flit(vc).map(|flit|flit.watch).unwrap_or(false);
			if self.buffers[input].state(vc)==VcState::Active
			{
				let (dest_output,dest_vc) = assigned_output(&self.buffers[input],vc)?;
				let dest = &self.next_buffers[dest_output];
				if dest.is_full_for(dest_vc,now) || !self.output_has_room(dest_output)
				{
					stalls[index] = Some(full_stall(dest));
					continue;
				}
				let requested = self.sw_alloc_add_request(input,vc,dest_output)?;
				if watched && requested
				{
					log::trace!("router {} input {} vc {} requests the switch towards output {} at cycle {}",self.info.index,input,vc,dest_output,now);
				}
				continue;
			}
			let candidates : Vec<RouteCandidate> = self.buffers[input].vc(vc).route_set().candidates().to_vec();
			for candidate in candidates.iter()
			{
				let dest_output = candidate.output_port;
				let mut elig = false;
				let mut cred = false;
				if spec_check_elig
				{
					let dest = &self.next_buffers[dest_output];
					let (vc_start,vc_end) = candidate_range(&self.noq_next[input][vc],candidate);
					for dest_vc in vc_start..=vc_end
					{
						if dest.is_available_for(dest_vc) && self.output_has_room(dest_output)
						{
							elig = true;
							if !spec_check_cred || !dest.is_full_for(dest_vc,now)
							{
								cred = true;
								break;
							}
						}
					}
				}
				if spec_check_elig && !elig
				{
					stalls[index] = Some(Stall::BufferBusy);
				}
				else if spec_check_cred && !cred
				{
					stalls[index] = Some(full_stall(&self.next_buffers[dest_output]));
				}
				else
				{
					let requested = self.sw_alloc_add_request(input,vc,dest_output)?;
					if watched && requested
					{
						log::trace!("router {} input {} vc {} speculatively requests the switch towards output {} at cycle {}",self.info.index,input,vc,dest_output,now);
					}
				}
			}
		}
		self.sw_allocator.allocate();
		if let Some(ref mut spec_allocator) = self.spec_sw_allocator
		{
			spec_allocator.allocate();
		}
		for (index,&(input,vc)) in items.iter().enumerate()
		{
			let output_port = self.buffers[input].vc(vc).output_port();
			let ready = stage_ready(now,context.delays.sw_alloc_delay(self.info.index,output_port,now)?);
			let expanded_input = input*input_speedup + vc%input_speedup;
			let outcome = match stalls[index]
			{
				Some(stall) => Outcome::Stalled(stall),
				None => match self.sw_allocator.output_assigned(expanded_input)
				{
					Some(expanded_output) =>
					{
						if self.sw_allocator.read_request(expanded_input,expanded_output).map(|request|request.label)==Some(vc)
						{
							self.sw_rr_offset[expanded_input] = (vc+input_speedup)%vcs;
							Outcome::Granted(expanded_output)
						}
						else
						{
							Outcome::Stalled(Stall::CrossbarConflict)
						}
					},
					None => match self.spec_sw_allocator
					{
						Some(ref spec_allocator) => match spec_allocator.output_assigned(expanded_input)
						{
							Some(expanded_output) =>
							{
								let masked = if spec_mask_by_reqs
								{
									self.sw_allocator.output_has_requests(expanded_output)
								}
								else
								{
									self.sw_allocator.input_assigned(expanded_output).is_some()
								};
								if !masked && spec_allocator.read_request(expanded_input,expanded_output).map(|request|request.label)==Some(vc)
								{
									self.sw_rr_offset[expanded_input] = (vc+input_speedup)%vcs;
									Outcome::Granted(expanded_output)
								}
								else
								{
									Outcome::Stalled(Stall::CrossbarConflict)
								}
							},
							None => Outcome::Stalled(Stall::CrossbarConflict),
						},
						None => Outcome::Stalled(Stall::CrossbarConflict),
					},
				},
			};
			if let Some(slot) = self.sw_alloc_vcs.get_mut(index)
			{
				slot.ready = Some(ready);
				slot.item.outcome = outcome;
			}
		}
		if !speculative && self.sw_alloc_delay<=1
		{
			return Ok(());
		}
		//Check again the grants completing now: the speculative ones against the VC allocation, all of them against the downstream space.
		let ready = self.sw_alloc_vcs.ready_len(now);
		for index in 0..ready
		{
			let item = match self.sw_alloc_vcs.get(index)
			{
				Some(slot) => slot.item,
				None => break,
			};
			let expanded_output = match item.outcome
			{
				Outcome::Granted(expanded_output) => expanded_output,
				_ => continue,
			};
			let (input,vc) = (item.input,item.vc);
			let output = expanded_output/output_speedup;
			let dest = &self.next_buffers[output];
			let expanded_input = input*input_speedup + vc%input_speedup;
			let virtual_channel = self.buffers[input].vc(vc);
			let revised = if self.switch_hold_in[expanded_input].is_some() || self.switch_hold_out[expanded_output].is_some()
			{
				Some(Outcome::Stalled(Stall::CrossbarConflict))
			}
			else if speculative && virtual_channel.state()==VcState::VcAlloc
			{
				match self.vc_allocator
				{
					Some(ref vc_allocator) =>
					{
						let request_input = vc_request_input(self.config.vc_shuffle_requests,inputs,vcs,input,vc);
						match vc_allocator.output_assigned(request_input)
						{
							//counted by the VC allocation
							None => Some(Outcome::Undecided),
							Some(output_and_vc) if output_and_vc/vcs!=output => Some(Outcome::Stalled(Stall::BufferConflict)),
							Some(output_and_vc) if dest.is_full_for(output_and_vc%vcs,now) => Some(Outcome::Stalled(full_stall(dest))),
							Some(_) => None,
						}
					},
					None =>
					{
						let mut busy = true;
						let mut full = true;
						let mut reserved = false;
						for candidate in virtual_channel.route_set().candidates().iter().filter(|candidate|candidate.output_port==output)
						{
							let (vc_start,vc_end) = candidate_range(&self.noq_next[input][vc],candidate);
							for out_vc in vc_start..=vc_end
							{
								if dest.is_available_for(out_vc)
								{
									busy = false;
									if !dest.is_full_for(out_vc,now)
									{
										full = false;
										break;
									}
									else if !dest.is_full()
									{
										reserved = true;
									}
								}
							}
							if !full
							{
								break;
							}
						}
						if busy
						{
							Some(Outcome::Stalled(Stall::BufferBusy))
						}
						else if full
						{
							Some(Outcome::Stalled(if reserved {Stall::BufferReserved} else {Stall::BufferFull}))
						}
						else
						{
							None
						}
					},
				}
			}
			else
			{
				let (_,match_vc) = assigned_output(&self.buffers[input],vc)?;
				if dest.is_full_for(match_vc,now) { Some(Outcome::Stalled(full_stall(dest))) } else { None }
			};
			if let Some(outcome) = revised
			{
				if let Some(slot) = self.sw_alloc_vcs.get_mut(index)
				{
					slot.item.outcome = outcome;
				}
			}
		}
		Ok(())
	}
	///The downstream virtual channel for a packet whose VC allocation is piggybacked on the switch allocation.
	fn piggyback_vc(&self, input:usize, vc:usize, output:usize, now:Time) -> Option<usize>
	{
		let vcs = self.config.num_vcs;
		let virtual_channel = self.buffers[input].vc(vc);
		let class = virtual_channel.front_flit().map(|flit|flit.class).unwrap_or(0) % self.config.classes;
		let offset = self.vc_rr_offset[output*self.config.classes + class];
		let dest = &self.next_buffers[output];
		let mut best : Option<(usize,i64)> = None;
		for candidate in virtual_channel.route_set().candidates().iter().filter(|candidate|candidate.output_port==output)
		{
			let (vc_start,vc_end) = candidate_range(&self.noq_next[input][vc],candidate);
			for out_vc in vc_start..=vc_end
			{
				let mut priority = candidate.priority;
				if self.config.vc_prioritize_empty && !dest.is_empty_for(out_vc)
				{
					priority = priority.saturating_add(i64::MIN);
				}
				let better = match best
				{
					None => true,
					Some((best_vc,best_priority)) => supersedes(out_vc,priority,best_vc,best_priority,offset,vcs),
				};
				if dest.is_available_for(out_vc) && !dest.is_full_for(out_vc,now) && better
				{
					best = Some((out_vc,priority));
				}
			}
		}
		best.map(|(out_vc,_)|out_vc)
	}
	///Move the front flit of a virtual channel into the crossbar towards `output` and account it downstream. Returns whether it was a tail.
	fn traverse(&mut self, input:usize, vc:usize, output:usize, match_vc:usize, expanded_input:usize, expanded_output:usize, context:&mut SimulationContext) -> Result<bool,Error>
	{
		let now = context.cycle;
		let mut flit = self.buffers[input].remove_flit(vc)?;
		flit.hops+=1;
		flit.vc = match_vc;
		if self.routing_delay==0 && flit.head
		{
			let sink = self.output_channels[output].as_ref().and_then(|channel|channel.borrow().sink());
			match sink
			{
				Some(sink) =>
				{
					let noq_range = if self.config.noq { self.noq_next[input][vc].take() } else { None };
					match noq_range
					{
						Some(range) =>
						{
							flit.lookahead_route.clear();
							flit.lookahead_route.add_range(range.port,range.vc_start,range.vc_end,0);
						},
						None =>
						{
							let route = self.routing.route(&sink.router,&mut flit,sink.port,false,&mut context.rng);
							flit.lookahead_route = route;
						},
					}
				},
				None => flit.lookahead_route.clear(),
			}
		}
		self.next_buffers[output].sending_flit(&flit,now)?;
		let credits = &mut context.credits;
		self.out_queue_credits.entry(input).or_insert_with(||credits.acquire()).vcs.insert(vc);
		if flit.watch
		{
			log::debug!("router {} switches flit {} of packet {} from input {} vc {} to output {} vc {} at cycle {}",self.info.index,flit.id,flit.packet,input,vc,output,match_vc,now);
		}
		let tail = flit.tail;
		self.crossbar_flits.push_unscheduled(CrossbarItem{flit,expanded_input,expanded_output});
		self.statistics.sw_grants+=1;
		Ok(tail)
	}
	fn sw_alloc_update(&mut self, context:&mut SimulationContext) -> Result<(),Error>
	{
		let vcs = self.config.num_vcs;
		while let Some(item) = self.sw_alloc_vcs.pop_ready(context.cycle)
		{
			let (input,vc) = (item.input,item.vc);
			let expanded_output = match item.outcome
			{
				Outcome::Granted(expanded_output) => expanded_output,
				outcome =>
				{
					if let Outcome::Stalled(stall) = outcome
					{
						self.statistics.count_stall(stall);
					}
					self.sw_alloc_vcs.push_unscheduled(StageItem::new(input,vc));
					continue;
				},
			};
			let expanded_input = self.expanded_input(input,vc);
			let output = expanded_output/self.config.output_speedup;
			let match_vc = if self.buffers[input].state(vc)==VcState::VcAlloc
			{
				if self.vc_allocator.is_some()
				{
					//The speculation won the switch but the VC allocation has not completed yet.
					self.sw_alloc_vcs.push_unscheduled(StageItem::new(input,vc));
					continue;
				}
				match self.piggyback_vc(input,vc,output,context.cycle)
				{
					Some(match_vc) =>
					{
						self.buffers[input].set_state(vc,VcState::Active)?;
						self.buffers[input].vc_mut(vc).set_output(output,match_vc);
						self.next_buffers[output].take_buffer(match_vc,input*vcs+vc)?;
						let class = self.buffers[input].front_flit(vc).map(|flit|flit.class).unwrap_or(0) % self.config.classes;
						self.vc_rr_offset[output*self.config.classes + class] = (match_vc+1)%vcs;
						self.statistics.vc_grants+=1;
						match_vc
					},
					None =>
					{
						self.statistics.count_stall(Stall::BufferBusy);
						self.sw_alloc_vcs.push_unscheduled(StageItem::new(input,vc));
						continue;
					},
				}
			}
			else
			{
				assigned_output(&self.buffers[input],vc)?.1
			};
			let tail = self.traverse(input,vc,output,match_vc,expanded_input,expanded_output,context)?;
			if self.buffers[input].vc(vc).is_empty()
			{
				if tail
				{
					self.buffers[input].set_state(vc,VcState::Idle)?;
				}
			}
			else if tail
			{
				self.start_packet(input,vc,&mut context.rng)?;
			}
			else if self.config.hold_switch_for_packet
			{
				self.switch_hold_vc[expanded_input] = Some(vc);
				self.switch_hold_in[expanded_input] = Some(expanded_output);
				self.switch_hold_out[expanded_output] = Some(expanded_input);
				self.sw_hold_vcs.push_unscheduled(StageItem::new(input,vc));
			}
			else
			{
				self.sw_alloc_vcs.push_unscheduled(StageItem::new(input,vc));
			}
		}
		Ok(())
	}
	fn switch_evaluate(&mut self, context:&mut SimulationContext) -> Result<(),Error>
	{
		let now = context.cycle;
		let pending = self.crossbar_flits.unscheduled_len();
		for slot in self.crossbar_flits.iter_mut().take(pending)
		{
			slot.ready = Some(stage_ready(now,context.delays.st_final_delay(self.info.index)?));
		}
		Ok(())
	}
	fn switch_update(&mut self, context:&mut SimulationContext)
	{
		while let Some(item) = self.crossbar_flits.pop_ready(context.cycle)
		{
			let output = item.expanded_output/self.config.output_speedup;
			self.output_buffers[output].push_back(item.flit);
		}
	}
	fn output_queuing(&mut self)
	{
		for (input,credit) in std::mem::take(&mut self.out_queue_credits)
		{
			self.credit_buffers[input].push_back(credit);
		}
	}
}

impl Router for InputQueued
{
	fn index(&self) -> usize
	{
		self.info.index
	}
	fn info(&self) -> RouterInfo
	{
		self.info
	}
	fn num_virtual_channels(&self) -> usize
	{
		self.config.num_vcs
	}
	fn add_input_channel(&mut self, port:usize, flits:Rc<RefCell<FlitChannel>>, credits:Rc<RefCell<CreditChannel>>)
	{
		assert!(port<self.info.inputs,"router {} has no input {}",self.info.index,port);
		self.input_channels[port]=Some(flits);
		self.input_credit_channels[port]=Some(credits);
	}
	fn add_output_channel(&mut self, port:usize, flits:Rc<RefCell<FlitChannel>>, credits:Rc<RefCell<CreditChannel>>)
	{
		assert!(port<self.info.outputs,"router {} has no output {}",self.info.index,port);
		self.next_buffers[port].set_min_latency(1);
		self.output_channels[port]=Some(flits);
		self.output_credit_channels[port]=Some(credits);
	}
	fn read_inputs(&mut self, context:&mut SimulationContext) -> Result<(),Error>
	{
		let now = context.cycle;
		let mut activity = false;
		for (input,channel) in self.input_channels.iter().enumerate()
		{
			if let Some(channel) = channel
			{
				if let Some(flit) = channel.borrow_mut().receive()
				{
					if flit.watch
					{
						log::debug!("router {} received flit {} of packet {} at input {} vc {} at cycle {}",self.info.index,flit.id,flit.packet,input,flit.vc,now);
					}
					self.statistics.flits_received+=1;
					self.in_queue_flits.insert(input,flit);
					activity = true;
				}
			}
		}
		for (output,channel) in self.output_credit_channels.iter().enumerate()
		{
			if let Some(channel) = channel
			{
				if let Some(credit) = channel.borrow_mut().receive()
				{
					let delay = context.delays.credit_delay(self.info.index)?;
					self.proc_credits.push((credit,output),now+delay);
					self.statistics.credits_received+=1;
					activity = true;
				}
			}
		}
		self.active = self.active || activity;
		Ok(())
	}
	fn evaluate(&mut self, context:&mut SimulationContext) -> Result<(),Error>
	{
		context.delays.gating_tick(self.info.index,self.active);
		if !self.active
		{
			return Ok(());
		}
		self.statistics.active_cycles+=1;
		self.statistics.queue_ticks+=self.in_queue_flits.len() as u64;
		self.statistics.route_ticks+=self.route_vcs.len() as u64;
		self.statistics.vc_alloc_ticks+=self.vc_alloc_vcs.len() as u64;
		self.statistics.sw_alloc_ticks+=self.sw_alloc_vcs.len() as u64;
		self.statistics.crossbar_ticks+=self.crossbar_flits.len() as u64;
		self.input_queuing(context)?;
		let mut activity = !self.proc_credits.is_empty();
		if !self.route_vcs.is_empty()
		{
			self.route_evaluate(context)?;
		}
		if let Some(ref mut allocator) = self.vc_allocator
		{
			allocator.clear();
		}
		if !self.vc_alloc_vcs.is_empty()
		{
			self.vc_alloc_evaluate(context)?;
		}
		if self.config.hold_switch_for_packet && !self.sw_hold_vcs.is_empty()
		{
			self.sw_hold_evaluate(context)?;
		}
		self.sw_allocator.clear();
		if let Some(ref mut spec_allocator) = self.spec_sw_allocator
		{
			spec_allocator.clear();
		}
		if !self.sw_alloc_vcs.is_empty()
		{
			self.sw_alloc_evaluate(context)?;
		}
		if !self.crossbar_flits.is_empty()
		{
			self.switch_evaluate(context)?;
		}
		if !self.route_vcs.is_empty()
		{
			self.route_update(context)?;
			activity = activity || !self.route_vcs.is_empty();
		}
		if !self.vc_alloc_vcs.is_empty()
		{
			self.vc_alloc_update(context)?;
			activity = activity || !self.vc_alloc_vcs.is_empty();
		}
		if self.config.hold_switch_for_packet && !self.sw_hold_vcs.is_empty()
		{
			self.sw_hold_update(context)?;
			activity = activity || !self.sw_hold_vcs.is_empty();
		}
		if !self.sw_alloc_vcs.is_empty()
		{
			self.sw_alloc_update(context)?;
			activity = activity || !self.sw_alloc_vcs.is_empty();
		}
		if !self.crossbar_flits.is_empty()
		{
			self.switch_update(context);
			activity = activity || !self.crossbar_flits.is_empty();
		}
		self.active = activity;
		self.output_queuing();
		Ok(())
	}
	fn write_outputs(&mut self, _context:&mut SimulationContext) -> Result<(),Error>
	{
		for (output,queue) in self.output_buffers.iter_mut().enumerate()
		{
			if let Some(flit) = queue.pop_front()
			{
				match self.output_channels[output]
				{
					Some(ref channel) => channel.borrow_mut().send(flit)?,
					None => return Err(Error::undetermined(source_location!()).with_message(format!("router {} has no channel at output {}",self.info.index,output))),
				}
				self.statistics.flits_sent+=1;
			}
		}
		for (input,queue) in self.credit_buffers.iter_mut().enumerate()
		{
			if let Some(credit) = queue.pop_front()
			{
				match self.input_credit_channels[input]
				{
					Some(ref channel) => channel.borrow_mut().send(credit)?,
					None => return Err(Error::undetermined(source_location!()).with_message(format!("router {} has no credit channel at input {}",self.info.index,input))),
				}
				self.statistics.credits_sent+=1;
			}
		}
		Ok(())
	}
	fn is_active(&self) -> bool
	{
		self.active
	}
	fn used_credits(&self) -> Vec<usize>
	{
		let vcs = self.config.num_vcs;
		self.next_buffers.iter().flat_map(|dest|(0..vcs).map(move |vc|dest.occupancy_for(vc))).collect()
	}
	fn free_credits(&self, now:Time) -> Vec<i64>
	{
		let vcs = self.config.num_vcs;
		self.next_buffers.iter().flat_map(|dest|(0..vcs).map(move |vc|dest.available_for(vc,now))).collect()
	}
	fn max_credits(&self, now:Time) -> Vec<i64>
	{
		let vcs = self.config.num_vcs;
		self.next_buffers.iter().flat_map(|dest|(0..vcs).map(move |vc|dest.limit_for(vc,now))).collect()
	}
	fn used_credit(&self, output:usize) -> usize
	{
		self.next_buffers[output].occupancy()
	}
	fn buffer_occupancy(&self, input:usize) -> usize
	{
		self.buffers[input].occupancy()
	}
	fn statistics(&self) -> &RouterStatistics
	{
		&self.statistics
	}
	fn aggregate_statistics(&self, statistics:Option<ConfigurationValue>, router_index:usize, total_routers:usize, cycle:Time) -> Option<ConfigurationValue>
	{
		self.statistics.aggregate("InputQueued",statistics,router_index,total_routers,cycle)
	}
	fn reset_statistics(&mut self, next_cycle:Time)
	{
		self.statistics=RouterStatistics::new(next_cycle);
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::config::parse_configuration;
	use crate::delay::DelayConfig;
	use crate::error::ErrorKind;
	use crate::routing::DestinationTag;
	fn build(text:&str, router_index:usize, outputs:usize) -> Result<InputQueued,Error>
	{
		let cv = parse_configuration(text).unwrap();
		let delays = DelayConfig::synchronous(1,&RouterConfiguration::from_cv(&cv));
		let plugs = Plugs::default();
		InputQueued::new(RouterBuilderArgument{
			router_index,
			inputs: 2,
			outputs,
			cv: &cv,
			routing: Rc::new(DestinationTag::with_vcs(4)),
			delays: &delays,
			plugs: &plugs,
		})
	}
	#[test]
	fn default_router()
	{
		let router = build("IQRouter{}",0,3).unwrap();
		assert_eq!(router.info(),RouterInfo{index:0,inputs:2,outputs:3});
		assert_eq!(router.num_virtual_channels(),4);
		assert!(!router.is_active());
		assert_eq!(router.free_credits(0),vec![4;12]);
		assert_eq!(router.virtual_channel(1,3).state(),VcState::Idle);
		assert!(router.next_buffer(2).is_available_for(0));
	}
	#[test]
	fn allocation_needs_a_cycle()
	{
		match build("IQRouter{vc_alloc_delay:0}",0,2)
		{
			Err(Error{kind:ErrorKind::ZeroDelay{stage:"vc_alloc"},..}) => (),
			_ => panic!("a VC allocation without delay was accepted"),
		}
		match build("IQRouter{sw_alloc_delay:0}",0,2)
		{
			Err(Error{kind:ErrorKind::ZeroDelay{stage:"sw_alloc"},..}) => (),
			_ => panic!("a switch allocation without delay was accepted"),
		}
	}
	#[test]
	fn incompatible_options()
	{
		for text in [
			"IQRouter{vc_allocator:\"piggyback\"}",
			"IQRouter{noq:true}",
			"IQRouter{noq:true,routing_delay:0,num_vcs:2,buf_size:8}",
		].iter()
		{
			match build(text,0,4)
			{
				Err(Error{kind:ErrorKind::IncompatibleConfiguration,..}) => (),
				_ => panic!("{} was accepted",text),
			}
		}
		assert!(build("IQRouter{noq:true,routing_delay:0}",0,4).is_ok());
		assert!(build("IQRouter{vc_allocator:\"piggyback\",speculative:true}",0,4).is_ok());
	}
	#[test]
	fn unknown_allocator()
	{
		match build("IQRouter{sw_allocator:\"telepathy\"}",0,2)
		{
			Err(Error{kind:ErrorKind::UnknownAllocator{..},..}) => (),
			_ => panic!("telepathy is not an allocator"),
		}
	}
	#[test]
	fn router_without_delays()
	{
		match build("IQRouter{}",3,2)
		{
			Err(Error{kind:ErrorKind::MissingDelays{router:3},..}) => (),
			_ => panic!("router 3 was built without delays"),
		}
	}
	#[test]
	fn speedup_expands_the_switch()
	{
		let router = build("IQRouter{input_speedup:2,output_speedup:3}",0,2).unwrap();
		assert_eq!(router.sw_allocator.num_inputs(),4);
		assert_eq!(router.sw_allocator.num_outputs(),6);
		assert_eq!(router.expanded_input(1,3),3);
		assert_eq!(router.expanded_output(1,1),4);
		assert_eq!(router.vc_allocator.as_ref().map(|allocator|allocator.num_inputs()),Some(8));
	}
	#[test]
	fn request_order_of_the_vc_allocator()
	{
		assert_eq!(vc_request_input(false,3,4,1,2),6);
		assert_eq!(vc_request_input(true,3,4,1,2),7);
		assert_eq!(stage_ready(10,1),10);
		assert_eq!(stage_ready(10,3),12);
		assert_eq!(stage_ready(0,0),0);
	}
}
