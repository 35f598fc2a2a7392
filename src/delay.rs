/*!

The delays of the pipeline stages of each router, and the power gating bookkeeping.

A [DelayConfig] is consulted by the routers every time a stage schedules an item, instead of using a constant. A synchronous router always returns the configured delay.
An asynchronous router samples each delay from a normal distribution around the configured value, truncated to an integer and clamped to at least one cycle.
The switch allocation of asynchronous and metastable routers is further penalized when the same output was allocated shortly before.

Configuration example:

```ignore
DelayConfig
{
	routing_delays: [1,1,2,1],
	vc_alloc_delays: [1],
	sw_alloc_delays: [1],
	asynchronous: [false,true,true,false],
	routing_std_devs: [0,1,1,0],
	sw_alloc_thresholds: [4],
	sw_alloc_threshold_std_devs: [2],
	seed: 3,
	gating: PowerGating { mode: 1, sleep_threshold: 1800, break_even_threshold: 3500 },
}
```

Lists of a single element apply to every router. The number of routers is given by `routers` or by the longest list.

*/

use rand::{Rng,SeedableRng};
use rand::rngs::StdRng;

use quantifiable_derive::Quantifiable;//the derive macro
use crate::config::RouterConfiguration;
use crate::config_parser::ConfigurationValue;
use crate::error::Error;
use crate::source_location;
use crate::match_object_panic;
use crate::Time;

/// The configured delay of a stage and its deviation when asynchronous.
#[derive(Clone,Copy,Debug,Default,PartialEq,Eq,Quantifiable)]
pub struct StageDelay
{
	pub mean: u64,
	pub std_dev: u64,
}

impl StageDelay
{
	pub fn fixed(mean:u64) -> StageDelay
	{
		StageDelay{mean,std_dev:0}
	}
}

/// Sample a normal distribution with the Box-Muller transform.
fn sample_normal(rng:&mut StdRng, mean:f64, std_dev:f64) -> f64
{
	if std_dev<=0.0
	{
		return mean;
	}
	//in (0,1] to keep the logarithm finite
	let u1 = 1.0 - rng.gen::<f64>();
	let u2 = rng.gen::<f64>();
	mean + std_dev * (-2.0*u1.ln()).sqrt() * (2.0*std::f64::consts::PI*u2).cos()
}

/// The delays of a single router.
#[derive(Clone,Debug,Quantifiable)]
pub struct RouterDelays
{
	pub credit: StageDelay,
	pub routing: StageDelay,
	pub vc_alloc: StageDelay,
	pub sw_alloc: StageDelay,
	pub st_final: StageDelay,
	pub asynchronous: bool,
	pub metastable: bool,
	///An output allocated again before this many cycles gets a transition penalty.
	pub sw_alloc_threshold: u64,
	pub sw_alloc_threshold_std_dev: u64,
	///An output allocated again before this many cycles may fall into metastability.
	pub metastable_threshold: u64,
	pub metastable_max_penalty: u64,
	///Last cycle each output was switch allocated.
	previous_switch_allocation: Vec<Option<Time>>,
	rng: StdRng,
}

impl RouterDelays
{
	fn synchronous(config:&RouterConfiguration, seed:u64) -> RouterDelays
	{
		RouterDelays{
			credit: StageDelay::fixed(config.credit_delay),
			routing: StageDelay::fixed(config.routing_delay),
			vc_alloc: StageDelay::fixed(config.vc_alloc_delay),
			sw_alloc: StageDelay::fixed(config.sw_alloc_delay),
			st_final: StageDelay::fixed(config.st_final_delay),
			asynchronous: false,
			metastable: false,
			sw_alloc_threshold: 0,
			sw_alloc_threshold_std_dev: 0,
			metastable_threshold: 0,
			metastable_max_penalty: 0,
			previous_switch_allocation: vec![],
			rng: StdRng::seed_from_u64(seed),
		}
	}
	fn sample(&mut self, delay:StageDelay) -> Time
	{
		if self.asynchronous
		{
			let value = sample_normal(&mut self.rng,delay.mean as f64,delay.std_dev as f64) as i64;
			value.max(1) as Time
		}
		else
		{
			delay.mean
		}
	}
	fn switch_allocation(&mut self, output:Option<usize>, now:Time) -> Time
	{
		let mut delay = self.sample(self.sw_alloc);
		let output = match output
		{
			Some(output) => output,
			None => return delay,
		};
		if output>=self.previous_switch_allocation.len()
		{
			self.previous_switch_allocation.resize(output+1,None);
		}
		if let Some(previous) = self.previous_switch_allocation[output]
		{
			let elapsed = now-previous;
			if self.asynchronous && elapsed < self.sw_alloc_threshold
			{
				let penalty = sample_normal(&mut self.rng,0.0,self.sw_alloc_threshold_std_dev as f64) as i64;
				delay += penalty.abs() as Time;
			}
			if self.metastable && elapsed < self.metastable_threshold
			{
				let x = self.rng.gen_range(1..=1000) as f64;
				let penalty = (1000.0/x).ln() / 1000f64.ln() * self.metastable_max_penalty as f64;
				delay += penalty as Time;
			}
		}
		self.previous_switch_allocation[output]=Some(now);
		delay
	}
}

/// The delays of every router of the network.
#[derive(Clone,Debug,Quantifiable)]
pub struct DelayConfig
{
	routers: Vec<RouterDelays>,
	gating: Option<PowerGating>,
}

/// Read a list of numbers, or a single number.
fn read_list(value:&ConfigurationValue, field:&str) -> Vec<u64>
{
	match value
	{
		&ConfigurationValue::Array(ref list) => list.iter().map(|v|v.as_usize().unwrap_or_else(|_|panic!("bad value for {}",field)) as u64).collect(),
		_ => vec![value.as_usize().unwrap_or_else(|_|panic!("bad value for {}",field)) as u64],
	}
}

fn read_flags(value:&ConfigurationValue, field:&str) -> Vec<bool>
{
	match value
	{
		&ConfigurationValue::Array(ref list) => list.iter().map(|v|v.as_bool().unwrap_or_else(|_|panic!("bad value for {}",field))).collect(),
		_ => vec![value.as_bool().unwrap_or_else(|_|panic!("bad value for {}",field))],
	}
}

/// Get the value of `router` in a list where a single element applies to all.
fn spread<T:Copy>(list:&[T], router:usize, default:T) -> T
{
	match list.len()
	{
		0 => default,
		1 => list[0],
		_ => list[router],
	}
}

fn stage_delay(means:&[u64], std_devs:&[u64], router:usize, default:u64) -> StageDelay
{
	StageDelay{
		mean: spread(means,router,default),
		std_dev: spread(std_devs,router,0),
	}
}

impl DelayConfig
{
	///Every router with the delays of `config` and no variability.
	pub fn synchronous(routers:usize, config:&RouterConfiguration) -> DelayConfig
	{
		DelayConfig{
			routers: (0..routers).map(|index|RouterDelays::synchronous(config,index as u64)).collect(),
			gating: None,
		}
	}
	pub fn from_cv(cv:&ConfigurationValue) -> Result<DelayConfig,Error>
	{
		let mut routers=None;
		let mut credit_delays=vec![];
		let mut routing_delays=vec![];
		let mut vc_alloc_delays=vec![];
		let mut sw_alloc_delays=vec![];
		let mut st_final_delays=vec![];
		let mut credit_std_devs=vec![];
		let mut routing_std_devs=vec![];
		let mut vc_alloc_std_devs=vec![];
		let mut sw_alloc_std_devs=vec![];
		let mut st_final_std_devs=vec![];
		let mut asynchronous=vec![];
		let mut metastable=vec![];
		let mut sw_alloc_thresholds=vec![];
		let mut sw_alloc_threshold_std_devs=vec![];
		let mut metastable_thresholds=vec![];
		let mut metastable_max_penalties=vec![];
		let mut seed=1u64;
		let mut gating=None;
		match_object_panic!(cv,"DelayConfig",value,
			"routers" => routers=Some(value.as_usize().expect("bad value for routers")),
			"credit_delays" => credit_delays=read_list(value,"credit_delays"),
			"routing_delays" => routing_delays=read_list(value,"routing_delays"),
			"vc_alloc_delays" => vc_alloc_delays=read_list(value,"vc_alloc_delays"),
			"sw_alloc_delays" => sw_alloc_delays=read_list(value,"sw_alloc_delays"),
			"st_final_delays" => st_final_delays=read_list(value,"st_final_delays"),
			"credit_std_devs" => credit_std_devs=read_list(value,"credit_std_devs"),
			"routing_std_devs" => routing_std_devs=read_list(value,"routing_std_devs"),
			"vc_alloc_std_devs" => vc_alloc_std_devs=read_list(value,"vc_alloc_std_devs"),
			"sw_alloc_std_devs" => sw_alloc_std_devs=read_list(value,"sw_alloc_std_devs"),
			"st_final_std_devs" => st_final_std_devs=read_list(value,"st_final_std_devs"),
			"asynchronous" => asynchronous=read_flags(value,"asynchronous"),
			"metastable" => metastable=read_flags(value,"metastable"),
			"sw_alloc_thresholds" => sw_alloc_thresholds=read_list(value,"sw_alloc_thresholds"),
			"sw_alloc_threshold_std_devs" => sw_alloc_threshold_std_devs=read_list(value,"sw_alloc_threshold_std_devs"),
			"metastable_thresholds" => metastable_thresholds=read_list(value,"metastable_thresholds"),
			"metastable_max_penalties" => metastable_max_penalties=read_list(value,"metastable_max_penalties"),
			"seed" => seed=value.as_usize().expect("bad value for seed") as u64,
			"gating" => gating=Some(PowerGating::from_cv(value)),
		);
		let lengths = [
			credit_delays.len(), routing_delays.len(), vc_alloc_delays.len(), sw_alloc_delays.len(), st_final_delays.len(),
			credit_std_devs.len(), routing_std_devs.len(), vc_alloc_std_devs.len(), sw_alloc_std_devs.len(), st_final_std_devs.len(),
			asynchronous.len(), metastable.len(),
			sw_alloc_thresholds.len(), sw_alloc_threshold_std_devs.len(), metastable_thresholds.len(), metastable_max_penalties.len(),
		];
		let num_routers = match routers
		{
			Some(n) => n,
			None => lengths.iter().cloned().max().unwrap_or(0),
		};
		if let Some(&bad) = lengths.iter().find(|&&len|len>1 && len!=num_routers)
		{
			return Err(Error::incompatible_configuration(source_location!()).with_message(format!("a list of {} delays for {} routers",bad,num_routers)));
		}
		let defaults=RouterConfiguration::default();
		let routers = (0..num_routers).map(|router|{
			RouterDelays{
				credit: stage_delay(&credit_delays,&credit_std_devs,router,defaults.credit_delay),
				routing: stage_delay(&routing_delays,&routing_std_devs,router,defaults.routing_delay),
				vc_alloc: stage_delay(&vc_alloc_delays,&vc_alloc_std_devs,router,defaults.vc_alloc_delay),
				sw_alloc: stage_delay(&sw_alloc_delays,&sw_alloc_std_devs,router,defaults.sw_alloc_delay),
				st_final: stage_delay(&st_final_delays,&st_final_std_devs,router,defaults.st_final_delay),
				asynchronous: spread(&asynchronous,router,false),
				metastable: spread(&metastable,router,false),
				sw_alloc_threshold: spread(&sw_alloc_thresholds,router,0),
				sw_alloc_threshold_std_dev: spread(&sw_alloc_threshold_std_devs,router,0),
				metastable_threshold: spread(&metastable_thresholds,router,0),
				metastable_max_penalty: spread(&metastable_max_penalties,router,0),
				previous_switch_allocation: vec![],
				rng: StdRng::seed_from_u64(seed.wrapping_add(router as u64)),
			}
		}).collect();
		let mut delays=DelayConfig{routers,gating:None};
		if let Some(gating)=gating
		{
			delays.set_gating(gating);
		}
		Ok(delays)
	}
	pub fn num_routers(&self) -> usize
	{
		self.routers.len()
	}
	///The delays of `router`. It is an error to ask for a router without delays.
	pub fn router(&self, router:usize) -> Result<&RouterDelays,Error>
	{
		self.routers.get(router).ok_or_else(||Error::missing_delays(source_location!(),router))
	}
	fn router_mut(&mut self, router:usize) -> Result<&mut RouterDelays,Error>
	{
		self.routers.get_mut(router).ok_or_else(||Error::missing_delays(source_location!(),router))
	}
	pub fn check_router(&self, router:usize) -> Result<(),Error>
	{
		self.router(router).map(|_|())
	}
	pub fn credit_delay(&mut self, router:usize) -> Result<Time,Error>
	{
		let delays=self.router_mut(router)?;
		Ok(delays.sample(delays.credit))
	}
	pub fn routing_delay(&mut self, router:usize) -> Result<Time,Error>
	{
		let delays=self.router_mut(router)?;
		Ok(delays.sample(delays.routing))
	}
	pub fn vc_alloc_delay(&mut self, router:usize) -> Result<Time,Error>
	{
		let delays=self.router_mut(router)?;
		Ok(delays.sample(delays.vc_alloc))
	}
	///The switch allocation delay of an item of `router` requesting `output`. Every call records the allocation of `output` at cycle `now`.
	pub fn sw_alloc_delay(&mut self, router:usize, output:Option<usize>, now:Time) -> Result<Time,Error>
	{
		Ok(self.router_mut(router)?.switch_allocation(output,now))
	}
	pub fn st_final_delay(&mut self, router:usize) -> Result<Time,Error>
	{
		let delays=self.router_mut(router)?;
		Ok(delays.sample(delays.st_final))
	}
	pub fn set_gating(&mut self, mut gating:PowerGating)
	{
		gating.resize(self.routers.len());
		self.gating=Some(gating);
	}
	pub fn gating(&self) -> Option<&PowerGating>
	{
		self.gating.as_ref()
	}
	///Account a cycle of `router` for power gating, if enabled.
	pub fn gating_tick(&mut self, router:usize, active:bool)
	{
		if let Some(ref mut gating)=self.gating
		{
			gating.tick(router,active);
		}
	}
}

/// How the sleep threshold of the routers is managed.
#[derive(Clone,Copy,Debug,PartialEq,Eq)]
pub enum GatingMode
{
	///All routers sleep after `sleep_threshold` idle cycles.
	Fixed,
	///Each router adapts its sleep threshold by steps of `break_even_threshold/8`, shrinking it after a gating that paid off and growing it otherwise.
	Adaptive,
}

quantifiable_simple!(GatingMode);

/**
Counts the idle periods of the routers to estimate the benefit of power gating them.

A router is gated once it has been idle for its sleep threshold. Gating a router only pays off when it stays gated longer than `break_even_threshold`.
For every idle period the counters record whether it was long enough to be worth gating (viable idle) and how many of its cycles were actually gated beyond the break even.
**/
#[derive(Clone,Debug,Quantifiable)]
pub struct PowerGating
{
	mode: GatingMode,
	sleep_threshold: u64,
	break_even_threshold: u64,
	sleep_threshold_step: u64,
	router_sleep_threshold: Vec<u64>,
	idle_ticks: Vec<u64>,
	viable_idle_ticks_sum: Vec<u64>,
	viable_idle_times_sum: Vec<u64>,
	gated_ticks: Vec<u64>,
	///Gated cycles beyond the break even. Negative when the gatings did not pay off.
	viable_gated_ticks_sum: Vec<i64>,
	gated_times_sum: Vec<u64>,
}

impl PowerGating
{
	pub fn new(mode:GatingMode, sleep_threshold:u64, break_even_threshold:u64) -> PowerGating
	{
		PowerGating{
			mode,
			sleep_threshold,
			break_even_threshold,
			sleep_threshold_step: break_even_threshold/8,
			router_sleep_threshold: vec![],
			idle_ticks: vec![],
			viable_idle_ticks_sum: vec![],
			viable_idle_times_sum: vec![],
			gated_ticks: vec![],
			viable_gated_ticks_sum: vec![],
			gated_times_sum: vec![],
		}
	}
	pub fn from_cv(cv:&ConfigurationValue) -> PowerGating
	{
		let mut mode=GatingMode::Fixed;
		let mut sleep_threshold=1800;
		let mut break_even_threshold=3500;
		match_object_panic!(cv,"PowerGating",value,
			"mode" => mode=match value.as_usize().expect("bad value for mode")
			{
				0 => GatingMode::Fixed,
				1 => GatingMode::Adaptive,
				m => panic!("unknown power gating mode {}",m),
			},
			"sleep_threshold" => sleep_threshold=value.as_usize().expect("bad value for sleep_threshold") as u64,
			"break_even_threshold" => break_even_threshold=value.as_usize().expect("bad value for break_even_threshold") as u64,
		);
		PowerGating::new(mode,sleep_threshold,break_even_threshold)
	}
	fn resize(&mut self, routers:usize)
	{
		self.router_sleep_threshold.resize(routers,self.sleep_threshold_step);
		self.idle_ticks.resize(routers,0);
		self.viable_idle_ticks_sum.resize(routers,0);
		self.viable_idle_times_sum.resize(routers,0);
		self.gated_ticks.resize(routers,0);
		self.viable_gated_ticks_sum.resize(routers,0);
		self.gated_times_sum.resize(routers,0);
	}
	fn sleep_threshold_of(&self, router:usize) -> u64
	{
		match self.mode
		{
			GatingMode::Fixed => self.sleep_threshold,
			GatingMode::Adaptive => self.router_sleep_threshold[router],
		}
	}
	///Account a cycle of `router`.
	pub fn tick(&mut self, router:usize, active:bool)
	{
		if router>=self.idle_ticks.len()
		{
			self.resize(router+1);
		}
		if !active
		{
			self.idle_ticks[router]+=1;
			if self.idle_ticks[router]>=self.sleep_threshold_of(router)
			{
				self.gated_ticks[router]+=1;
			}
			return;
		}
		let idle=self.idle_ticks[router];
		if idle==0
		{
			return;
		}
		let break_even=self.break_even_threshold;
		//The idle period was too short for the threshold to gate it.
		let mut missed=false;
		if idle>=break_even
		{
			missed = idle-break_even < self.router_sleep_threshold[router];
			self.viable_idle_ticks_sum[router]+=idle-break_even;
			self.viable_idle_times_sum[router]+=1;
		}
		self.idle_ticks[router]=0;
		let gated=self.gated_ticks[router];
		if gated==0
		{
			return;
		}
		if self.mode==GatingMode::Adaptive
		{
			let step=self.sleep_threshold_step;
			let threshold=&mut self.router_sleep_threshold[router];
			if gated>break_even
			{
				if *threshold>step
				{
					*threshold-=step;
				}
			}
			else if missed
			{
				*threshold=step;
			}
			else if *threshold<break_even
			{
				*threshold+=step;
			}
			log::trace!("sleep threshold of router {} is now {}",router,*threshold);
		}
		self.viable_gated_ticks_sum[router]+=gated as i64 - break_even as i64;
		self.gated_ticks[router]=0;
		self.gated_times_sum[router]+=1;
	}
	pub fn sleep_threshold(&self, router:usize) -> u64
	{
		self.sleep_threshold_of(router)
	}
	pub fn idle_ticks(&self, router:usize) -> u64
	{
		self.idle_ticks[router]
	}
	pub fn gated_ticks(&self, router:usize) -> u64
	{
		self.gated_ticks[router]
	}
	pub fn viable_idle_ticks(&self, router:usize) -> u64
	{
		self.viable_idle_ticks_sum[router]
	}
	pub fn viable_idle_times(&self, router:usize) -> u64
	{
		self.viable_idle_times_sum[router]
	}
	pub fn viable_gated_ticks(&self, router:usize) -> i64
	{
		self.viable_gated_ticks_sum[router]
	}
	pub fn gated_times(&self, router:usize) -> u64
	{
		self.gated_times_sum[router]
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::config::parse_configuration;
	use crate::error::ErrorKind;
	#[test]
	fn synchronous_delays_are_the_configured_ones()
	{
		let config=RouterConfiguration{
			routing_delay: 2,
			sw_alloc_delay: 3,
			..RouterConfiguration::default()
		};
		let mut delays=DelayConfig::synchronous(2,&config);
		assert_eq!(delays.routing_delay(1).unwrap(),2);
		assert_eq!(delays.credit_delay(0).unwrap(),0);
		for now in 0..4
		{
			assert_eq!(delays.sw_alloc_delay(0,Some(1),now).unwrap(),3);
		}
		match delays.vc_alloc_delay(2)
		{
			Err(Error{kind:ErrorKind::MissingDelays{router:2},..}) => (),
			_ => panic!("router 2 has no delays"),
		}
	}
	#[test]
	fn asynchronous_delays_are_positive_and_reproducible()
	{
		let cv=parse_configuration("DelayConfig{ routing_delays:[1,5], routing_std_devs:[3], asynchronous:[true], seed:7 }").unwrap();
		let mut first=DelayConfig::from_cv(&cv).unwrap();
		let mut second=DelayConfig::from_cv(&cv).unwrap();
		assert_eq!(first.num_routers(),2);
		let mut total=0;
		for _ in 0..200
		{
			let a=first.routing_delay(0).unwrap();
			assert!(a>=1);
			assert_eq!(a,second.routing_delay(0).unwrap());
			total+=first.routing_delay(1).unwrap();
			second.routing_delay(1).unwrap();
		}
		// The mean of router 1 is around 5.
		assert!(total>200*3 && total<200*7,"total {}",total);
	}
	#[test]
	fn bad_list_lengths()
	{
		let cv=parse_configuration("DelayConfig{ routing_delays:[1,1,1], vc_alloc_delays:[1,1] }").unwrap();
		match DelayConfig::from_cv(&cv)
		{
			Err(Error{kind:ErrorKind::IncompatibleConfiguration,..}) => (),
			_ => panic!("lists of different lengths were accepted"),
		}
	}
	#[test]
	fn metastability_penalizes_close_allocations()
	{
		let cv=parse_configuration("DelayConfig{ sw_alloc_delays:[2], metastable:[true], metastable_thresholds:[3], metastable_max_penalties:[100], routers:1 }").unwrap();
		let mut delays=DelayConfig::from_cv(&cv).unwrap();
		assert_eq!(delays.sw_alloc_delay(0,Some(0),10).unwrap(),2);
		// Far from the previous allocation.
		assert_eq!(delays.sw_alloc_delay(0,Some(0),20).unwrap(),2);
		// Other outputs have their own history.
		assert_eq!(delays.sw_alloc_delay(0,Some(1),21).unwrap(),2);
		let mut penalized=0;
		for now in 22..122
		{
			let delay=delays.sw_alloc_delay(0,Some(0),now).unwrap();
			assert!(delay>=2 && delay<=102);
			if delay>2
			{
				penalized+=1;
			}
		}
		// Only the highest values of x round the penalty down to nothing.
		assert!(penalized>50);
		// Items without output do not touch the history.
		assert_eq!(delays.sw_alloc_delay(0,None,200).unwrap(),2);
	}
	#[test]
	fn fixed_gating_counts_periods()
	{
		let mut gating=PowerGating::new(GatingMode::Fixed,2,3);
		for _ in 0..5
		{
			gating.tick(0,false);
		}
		assert_eq!(gating.idle_ticks(0),5);
		assert_eq!(gating.gated_ticks(0),4);
		gating.tick(0,true);
		assert_eq!(gating.idle_ticks(0),0);
		assert_eq!(gating.viable_idle_ticks(0),2);
		assert_eq!(gating.viable_idle_times(0),1);
		assert_eq!(gating.viable_gated_ticks(0),1);
		assert_eq!(gating.gated_times(0),1);
		// A short idle period is neither viable nor gated.
		gating.tick(0,false);
		gating.tick(0,true);
		assert_eq!(gating.viable_idle_times(0),1);
		assert_eq!(gating.gated_times(0),1);
	}
	#[test]
	fn adaptive_gating_moves_the_threshold()
	{
		let mut gating=PowerGating::new(GatingMode::Adaptive,0,16);
		gating.resize(1);
		assert_eq!(gating.sleep_threshold(0),2);
		// Long period: gated for 19 cycles, more than the break even.
		for _ in 0..20
		{
			gating.tick(0,false);
		}
		gating.tick(0,true);
		// Already at the step, cannot go lower.
		assert_eq!(gating.sleep_threshold(0),2);
		// Short period: gated 3 cycles, failed.
		for _ in 0..4
		{
			gating.tick(0,false);
		}
		gating.tick(0,true);
		assert_eq!(gating.sleep_threshold(0),4);
		for _ in 0..6
		{
			gating.tick(0,false);
		}
		gating.tick(0,true);
		assert_eq!(gating.sleep_threshold(0),6);
	}
}
