/*!

A cycle driver for a set of routers.

The [Simulation] owns the routers, the channels between them and the terminals at the edges of the network. Each call to [Simulation::step] advances one cycle:

1. the ejectors take the flits delivered to them and return their credits;
2. the injectors take their credits and send their next flit if its virtual channel has space;
3. every router reads its inputs, then every router evaluates its pipeline, then every router writes its outputs;
4. every channel moves its items.

The state shared by the whole network during a cycle is kept in a [SimulationContext], given by mutable reference to every router call.

*/

use std::rc::Rc;
use std::cell::RefCell;
use std::collections::VecDeque;

use rand::rngs::StdRng;
use rand::SeedableRng;
use quantifiable_derive::Quantifiable;//the derive macro
use crate::quantify::Quantifiable;
use crate::channel::{Endpoint,FlitChannel,CreditChannel};
use crate::config_parser::ConfigurationValue;
use crate::delay::DelayConfig;
use crate::error::Error;
use crate::flit::{Flit,Credit,Pool};
use crate::router::{Router,RouterBuilderArgument,new_router};
use crate::routing::RoutingFunction;
use crate::{Plugs,Time};

/// The state of the simulation visible to the routers.
#[derive(Quantifiable)]
pub struct SimulationContext
{
	///The current cycle.
	pub cycle: Time,
	pub delays: DelayConfig,
	pub rng: StdRng,
	pub flits: Pool<Flit>,
	pub credits: Pool<Credit>,
}

impl SimulationContext
{
	pub fn new(delays:DelayConfig, seed:u64) -> SimulationContext
	{
		SimulationContext{
			cycle: 0,
			delays,
			rng: StdRng::seed_from_u64(seed),
			flits: Pool::new(),
			credits: Pool::new(),
		}
	}
}

/// A source of flits attached to an input of a router. It tracks the free slots of each virtual channel of that input.
#[derive(Quantifiable)]
struct Injector
{
	router: usize,
	input: usize,
	flits: Rc<RefCell<FlitChannel>>,
	credits: Rc<RefCell<CreditChannel>>,
	pending: VecDeque<Flit>,
	free_slots: Vec<usize>,
	credits_returned: usize,
}

/// A sink of flits attached to an output of a router. Every flit is accepted and its credit returned at once.
#[derive(Quantifiable)]
struct Ejector
{
	flits: Rc<RefCell<FlitChannel>>,
	credits: Rc<RefCell<CreditChannel>>,
	received: Vec<(Time,Flit)>,
}

pub struct Simulation
{
	pub context: SimulationContext,
	routers: Vec<Rc<RefCell<dyn Router>>>,
	flit_channels: Vec<Rc<RefCell<FlitChannel>>>,
	credit_channels: Vec<Rc<RefCell<CreditChannel>>>,
	injectors: Vec<Injector>,
	ejectors: Vec<Ejector>,
	///The routing used to compute the route of the flits entering the network, needed by lookahead routing.
	injection_routing: Option<Rc<dyn RoutingFunction>>,
}

impl Simulation
{
	pub fn new(context:SimulationContext) -> Simulation
	{
		Simulation{
			context,
			routers: vec![],
			flit_channels: vec![],
			credit_channels: vec![],
			injectors: vec![],
			ejectors: vec![],
			injection_routing: None,
		}
	}
	///Add an already built router. Returns its position, which should match its index.
	pub fn add_router(&mut self, router:Rc<RefCell<dyn Router>>) -> usize
	{
		let index = self.routers.len();
		if router.borrow().index()!=index
		{
			log::warn!("router with index {} added at position {}",router.borrow().index(),index);
		}
		self.routers.push(router);
		index
	}
	///Build a router from its configuration with the delays of the context and add it.
	pub fn build_router(&mut self, cv:&ConfigurationValue, inputs:usize, outputs:usize, routing:Rc<dyn RoutingFunction>, plugs:&Plugs) -> Result<usize,Error>
	{
		let router = new_router(RouterBuilderArgument{
			router_index: self.routers.len(),
			inputs,
			outputs,
			cv,
			routing,
			delays: &self.context.delays,
			plugs,
		})?;
		Ok(self.add_router(router))
	}
	pub fn router(&self, index:usize) -> &Rc<RefCell<dyn Router>>
	{
		&self.routers[index]
	}
	pub fn num_routers(&self) -> usize
	{
		self.routers.len()
	}
	fn new_link(&mut self, latency:Time) -> Result<(Rc<RefCell<FlitChannel>>,Rc<RefCell<CreditChannel>>),Error>
	{
		let flits = Rc::new(RefCell::new(FlitChannel::new(latency)?));
		let credits = Rc::new(RefCell::new(CreditChannel::new(latency)?));
		self.flit_channels.push(flits.clone());
		self.credit_channels.push(credits.clone());
		Ok((flits,credits))
	}
	///Connect the output `output` of router `from` to the input `input` of router `to`, with channels of the given latency in both directions.
	pub fn connect(&mut self, from:usize, output:usize, to:usize, input:usize, latency:Time) -> Result<(),Error>
	{
		let (flits,credits) = self.new_link(latency)?;
		let source = Endpoint{router:self.routers[from].borrow().info(),port:output};
		let sink = Endpoint{router:self.routers[to].borrow().info(),port:input};
		flits.borrow_mut().set_source(source);
		flits.borrow_mut().set_sink(sink);
		credits.borrow_mut().set_source(sink);
		credits.borrow_mut().set_sink(source);
		self.routers[from].borrow_mut().add_output_channel(output,flits.clone(),credits.clone());
		self.routers[to].borrow_mut().add_input_channel(input,flits,credits);
		Ok(())
	}
	///Attach an injector to `input` of `router`. Each virtual channel of the input starts with `slots_per_vc` free slots.
	pub fn add_injector(&mut self, router:usize, input:usize, latency:Time, slots_per_vc:usize) -> Result<usize,Error>
	{
		let (flits,credits) = self.new_link(latency)?;
		let sink = Endpoint{router:self.routers[router].borrow().info(),port:input};
		flits.borrow_mut().set_sink(sink);
		credits.borrow_mut().set_source(sink);
		let vcs = self.routers[router].borrow().num_virtual_channels();
		self.routers[router].borrow_mut().add_input_channel(input,flits.clone(),credits.clone());
		self.injectors.push(Injector{
			router,
			input,
			flits,
			credits,
			pending: VecDeque::new(),
			free_slots: vec![slots_per_vc;vcs],
			credits_returned: 0,
		});
		Ok(self.injectors.len()-1)
	}
	///Attach an ejector to `output` of `router`.
	pub fn add_ejector(&mut self, router:usize, output:usize, latency:Time) -> Result<usize,Error>
	{
		let (flits,credits) = self.new_link(latency)?;
		let source = Endpoint{router:self.routers[router].borrow().info(),port:output};
		flits.borrow_mut().set_source(source);
		credits.borrow_mut().set_sink(source);
		self.routers[router].borrow_mut().add_output_channel(output,flits.clone(),credits.clone());
		self.ejectors.push(Ejector{
			flits,
			credits,
			received: vec![],
		});
		Ok(self.ejectors.len()-1)
	}
	///Set the routing computing the first route of each head flit when it is injected.
	pub fn set_injection_routing(&mut self, routing:Rc<dyn RoutingFunction>)
	{
		self.injection_routing=Some(routing);
	}
	///Queue a flit in an injector. It will be sent when its virtual channel has space.
	pub fn inject(&mut self, injector:usize, mut flit:Flit)
	{
		let injector = &mut self.injectors[injector];
		if flit.head
		{
			if let Some(ref routing) = self.injection_routing
			{
				let router = self.routers[injector.router].borrow().info();
				flit.lookahead_route = routing.route(&router,&mut flit,injector.input,true,&mut self.context.rng);
			}
		}
		injector.pending.push_back(flit);
	}
	///The flits received by an ejector with the cycle in which each arrived.
	pub fn ejected(&self, ejector:usize) -> &[(Time,Flit)]
	{
		&self.ejectors[ejector].received
	}
	///Flits of an injector still waiting to enter the router.
	pub fn pending(&self, injector:usize) -> usize
	{
		self.injectors[injector].pending.len()
	}
	///Credits received back by an injector.
	pub fn credits_returned(&self, injector:usize) -> usize
	{
		self.injectors[injector].credits_returned
	}
	pub fn cycle(&self) -> Time
	{
		self.context.cycle
	}
	///Advance a single cycle. Any error aborts the simulation.
	pub fn step(&mut self) -> Result<(),Error>
	{
		let now = self.context.cycle;
		for ejector in self.ejectors.iter_mut()
		{
			let flit = ejector.flits.borrow_mut().receive();
			if let Some(mut flit) = flit
			{
				if flit.watch
				{
					log::debug!("flit {} of packet {} ejected at cycle {}",flit.id,flit.packet,now);
				}
				let mut credit = self.context.credits.acquire();
				credit.vcs.insert(flit.vc);
				credit.head = flit.head;
				credit.tail = flit.tail;
				ejector.credits.borrow_mut().send(credit)?;
				flit.arrival_cycle = Some(now);
				ejector.received.push((now,flit));
			}
		}
		for injector in self.injectors.iter_mut()
		{
			let credit = injector.credits.borrow_mut().receive();
			if let Some(credit) = credit
			{
				for &vc in credit.vcs.iter()
				{
					injector.free_slots[vc]+=1;
				}
				injector.credits_returned+=1;
				self.context.credits.release(credit);
			}
			let vc = match injector.pending.front()
			{
				Some(flit) => flit.vc,
				None => continue,
			};
			if injector.free_slots[vc]>0
			{
				if let Some(mut flit) = injector.pending.pop_front()
				{
					injector.free_slots[vc]-=1;
					flit.injection_cycle = Some(now);
					injector.flits.borrow_mut().send(flit)?;
				}
			}
		}
		for router in self.routers.iter()
		{
			router.borrow_mut().read_inputs(&mut self.context)?;
		}
		for router in self.routers.iter()
		{
			router.borrow_mut().evaluate(&mut self.context)?;
		}
		for router in self.routers.iter()
		{
			router.borrow_mut().write_outputs(&mut self.context)?;
		}
		for channel in self.flit_channels.iter()
		{
			let mut channel = channel.borrow_mut();
			channel.read_inputs(now);
			channel.write_outputs(now);
		}
		for channel in self.credit_channels.iter()
		{
			let mut channel = channel.borrow_mut();
			channel.read_inputs(now);
			channel.write_outputs(now);
		}
		self.context.cycle+=1;
		Ok(())
	}
	///Advance `cycles` cycles.
	pub fn run(&mut self, cycles:Time) -> Result<(),Error>
	{
		for _ in 0..cycles
		{
			self.step()?;
		}
		Ok(())
	}
	///Whether nothing is pending in the terminals, the channels or the routers.
	pub fn is_idle(&self) -> bool
	{
		self.injectors.iter().all(|injector|injector.pending.is_empty())
			&& self.flit_channels.iter().all(|channel|channel.borrow().is_idle())
			&& self.credit_channels.iter().all(|channel|channel.borrow().is_idle())
			&& self.routers.iter().all(|router|!router.borrow().is_active())
	}
	///The statistics of all the routers aggregated, see [Router::aggregate_statistics].
	pub fn aggregate_statistics(&self) -> Option<ConfigurationValue>
	{
		let total = self.routers.len();
		let cycle = self.context.cycle;
		self.routers.iter().enumerate().fold(None,|statistics,(index,router)|router.borrow().aggregate_statistics(statistics,index,total,cycle))
	}
	pub fn reset_statistics(&mut self)
	{
		let next_cycle = self.context.cycle;
		for router in self.routers.iter()
		{
			router.borrow_mut().reset_statistics(next_cycle);
		}
	}
}

impl Quantifiable for Simulation
{
	fn total_memory(&self) -> usize
	{
		self.context.total_memory()
			+ self.routers.iter().map(|router|router.borrow().total_memory()).sum::<usize>()
			+ self.flit_channels.total_memory()
			+ self.credit_channels.total_memory()
			+ self.injectors.total_memory()
			+ self.ejectors.total_memory()
	}
	fn print_memory_breakdown(&self)
	{
		println!("context: {}",self.context.total_memory());
		println!("routers: {}",self.routers.iter().map(|router|router.borrow().total_memory()).sum::<usize>());
		println!("channels: {}",self.flit_channels.total_memory()+self.credit_channels.total_memory());
	}
	fn forecast_total_memory(&self) -> usize
	{
		unimplemented!();
	}
}

#[cfg(test)]
mod tests
{
	use super::*;
	use crate::config::{parse_configuration,RouterConfiguration};
	use crate::buffer::VcState;
	use crate::router::input_queued::InputQueued;
	use crate::routing::{DestinationTag,RoutingBuilderArgument,new_routing_function};

	///A context with synchronous delays for `routers` routers with the configuration `router_cv`.
	fn context(routers:usize, router_cv:&ConfigurationValue) -> SimulationContext
	{
		let config = RouterConfiguration::from_cv(router_cv);
		SimulationContext::new(DelayConfig::synchronous(routers,&config),7)
	}
	fn packet(first_id:usize, packet:usize, size:usize, vc:usize, destination:usize) -> Vec<Flit>
	{
		(0..size).map(|index|{
			let mut flit = Flit::new(first_id+index,packet);
			flit.head = index==0;
			flit.tail = index+1==size;
			flit.vc = vc;
			flit.destination = destination;
			flit
		}).collect()
	}
	fn single_router(text:&str, inputs:usize, outputs:usize, routing:Rc<dyn RoutingFunction>) -> (Simulation,Rc<RefCell<InputQueued>>)
	{
		let cv = parse_configuration(text).unwrap();
		let mut simulation = Simulation::new(context(1,&cv));
		let plugs = Plugs::default();
		let router = Rc::new(RefCell::new(InputQueued::new(RouterBuilderArgument{
			router_index: 0,
			inputs,
			outputs,
			cv: &cv,
			routing,
			delays: &simulation.context.delays,
			plugs: &plugs,
		}).unwrap()));
		simulation.add_router(router.clone());
		(simulation,router)
	}
	///Flits of each packet must arrive in order; returns the number of flits of each ejector.
	fn check_packet_order(simulation:&Simulation, ejectors:usize) -> Vec<usize>
	{
		(0..ejectors).map(|ejector|{
			let received = simulation.ejected(ejector);
			let mut packets : std::collections::BTreeMap<usize,usize> = std::collections::BTreeMap::new();
			for (_,flit) in received
			{
				if let Some(&last) = packets.get(&flit.packet)
				{
					assert!(flit.id>last,"flit {} of packet {} arrived after flit {}",flit.id,flit.packet,last);
				}
				else
				{
					assert!(flit.head,"packet {} did not start with its head",flit.packet);
				}
				packets.insert(flit.packet,flit.id);
			}
			received.len()
		}).collect()
	}
	#[test]
	fn a_packet_crosses_the_router()
	{
		let _ = env_logger::builder().is_test(true).try_init();
		let (mut simulation,router) = single_router("IQRouter{num_vcs:4,buf_size:16,buffer_policy:\"private\"}",1,1,Rc::new(DestinationTag::with_vcs(4)));
		let injector = simulation.add_injector(0,0,1,4).unwrap();
		let ejector = simulation.add_ejector(0,0,1).unwrap();
		for flit in packet(0,0,3,0,0)
		{
			simulation.inject(injector,flit);
		}
		simulation.run(30).unwrap();
		let received = simulation.ejected(ejector);
		assert_eq!(received.iter().map(|(_,flit)|flit.id).collect::<Vec<usize>>(),vec![0,1,2]);
		assert_eq!(received[1].0,received[0].0+1);
		assert_eq!(received[2].0,received[1].0+1);
		let router = router.borrow();
		assert_eq!(router.statistics().sw_grants,3);
		assert_eq!(router.statistics().vc_grants,1);
		assert_eq!(router.buffer_occupancy(0),0);
		assert_eq!(router.used_credit(0),0);
		assert_eq!(router.virtual_channel(0,0).state(),VcState::Idle);
		assert_eq!(simulation.credits_returned(injector),3);
		assert_eq!(simulation.context.credits.outstanding(),0);
		assert!(simulation.is_idle());
	}
	#[test]
	fn lookahead_routing_saves_the_routing_stage()
	{
		let mut arrivals = vec![];
		for text in ["IQRouter{routing_delay:1}","IQRouter{routing_delay:0}"].iter()
		{
			let routing : Rc<dyn RoutingFunction> = Rc::new(DestinationTag::with_vcs(4));
			let (mut simulation,_router) = single_router(text,1,1,routing.clone());
			simulation.set_injection_routing(routing);
			let injector = simulation.add_injector(0,0,1,4).unwrap();
			let ejector = simulation.add_ejector(0,0,1).unwrap();
			for flit in packet(0,0,1,0,0)
			{
				simulation.inject(injector,flit);
			}
			simulation.run(20).unwrap();
			assert_eq!(simulation.ejected(ejector).len(),1);
			arrivals.push(simulation.ejected(ejector)[0].0);
		}
		assert_eq!(arrivals[0],arrivals[1]+1);
	}
	#[test]
	fn contending_inputs_share_the_output()
	{
		let cv = parse_configuration("DestinationTag{classes:4}").unwrap();
		let plugs = Plugs::default();
		let routing : Rc<dyn RoutingFunction> = new_routing_function(RoutingBuilderArgument::new(&cv,4,&plugs)).unwrap().into();
		let (mut simulation,router) = single_router("IQRouter{num_vcs:4}",2,1,routing);
		let injectors = [simulation.add_injector(0,0,1,4).unwrap(),simulation.add_injector(0,1,1,4).unwrap()];
		let ejector = simulation.add_ejector(0,0,1).unwrap();
		for index in 0..20
		{
			for (side,&injector) in injectors.iter().enumerate()
			{
				let id = 2*index+side;
				simulation.inject(injector,packet(id,id,1,0,0).pop().unwrap());
			}
		}
		simulation.run(40).unwrap();
		let received = simulation.ejected(ejector);
		let from_first = received.iter().filter(|(_,flit)|flit.id%2==0).count();
		let from_second = received.len()-from_first;
		assert!(from_first>=4 && from_second>=4,"unfair service: {} and {}",from_first,from_second);
		assert!((from_first as i64-from_second as i64).abs()<=2,"unfair service: {} and {}",from_first,from_second);
		assert!(router.borrow().statistics().stall_count(crate::router::Stall::BufferBusy)>0);
	}
	///Two packets per input, each input towards both outputs, on every virtual channel.
	fn mixed_traffic(simulation:&mut Simulation, injectors:&[usize])
	{
		let mut id = 0;
		for (side,&injector) in injectors.iter().enumerate()
		{
			for index in 0..4
			{
				for flit in packet(id,id,4,index%4,(index+side)%2)
				{
					simulation.inject(injector,flit);
				}
				id+=4;
			}
		}
	}
	fn run_mixed(text:&str) -> (Simulation,Rc<RefCell<InputQueued>>)
	{
		let routing : Rc<dyn RoutingFunction> = Rc::new(DestinationTag::with_vcs(4));
		let (mut simulation,router) = single_router(text,2,2,routing.clone());
		simulation.set_injection_routing(routing);
		let injectors = [simulation.add_injector(0,0,1,4).unwrap(),simulation.add_injector(0,1,1,4).unwrap()];
		simulation.add_ejector(0,0,1).unwrap();
		simulation.add_ejector(0,1,1).unwrap();
		mixed_traffic(&mut simulation,&injectors);
		simulation.run(200).unwrap();
		let counts = check_packet_order(&simulation,2);
		assert_eq!(counts,vec![16,16]);
		assert!(simulation.is_idle());
		assert_eq!(router.borrow().statistics().sw_grants,32);
		(simulation,router)
	}
	#[test]
	fn speculative_allocation_delivers_everything()
	{
		let (_simulation,router) = run_mixed("IQRouter{speculative:true}");
		assert_eq!(router.borrow().statistics().vc_grants,8);
	}
	#[test]
	fn speculative_allocation_with_its_own_allocator()
	{
		run_mixed("IQRouter{speculative:true,spec_sw_allocator:\"separable_input_first(round_robin)\"}");
	}
	#[test]
	fn piggybacked_allocation_delivers_everything()
	{
		let (_simulation,router) = run_mixed("IQRouter{speculative:true,vc_allocator:\"piggyback\"}");
		assert_eq!(router.borrow().statistics().vc_grants,8);
	}
	#[test]
	fn switch_hold_delivers_everything()
	{
		run_mixed("IQRouter{hold_switch_for_packet:true}");
	}
	#[test]
	fn lookahead_with_speedup()
	{
		run_mixed("IQRouter{routing_delay:0,input_speedup:2,output_speedup:2,sw_allocator:\"separable_output_first(round_robin)\"}");
	}
	#[test]
	fn pipelined_allocation()
	{
		let (_simulation,router) = run_mixed("IQRouter{vc_alloc_delay:2,sw_alloc_delay:2,st_final_delay:2,credit_delay:1}");
		assert_eq!(router.borrow().statistics().vc_grants,8);
	}
	#[test]
	fn noq_partitions_the_next_virtual_channels()
	{
		let cv = parse_configuration("IQRouter{routing_delay:0,noq:true}").unwrap();
		let routing_cv = parse_configuration("DestinationTag{radix:2}").unwrap();
		let plugs = Plugs::default();
		let routing : Rc<dyn RoutingFunction> = new_routing_function(RoutingBuilderArgument::new(&routing_cv,4,&plugs)).unwrap().into();
		let mut simulation = Simulation::new(context(2,&cv));
		simulation.set_injection_routing(routing.clone());
		simulation.build_router(&cv,1,2,routing.clone(),&plugs).unwrap();
		simulation.build_router(&cv,1,2,routing,&plugs).unwrap();
		simulation.connect(0,0,1,0,1).unwrap();
		let injector = simulation.add_injector(0,0,1,4).unwrap();
		simulation.add_ejector(0,1,1).unwrap();
		let towards_zero = simulation.add_ejector(1,0,1).unwrap();
		let towards_one = simulation.add_ejector(1,1,1).unwrap();
		for (index,&destination) in [0,2,0,2].iter().enumerate()
		{
			for flit in packet(index*2,index,2,index%4,destination)
			{
				simulation.inject(injector,flit);
			}
		}
		simulation.run(100).unwrap();
		let counts = check_packet_order(&simulation,3);
		assert_eq!(counts,vec![0,4,4]);
		assert!(simulation.ejected(towards_zero).iter().all(|(_,flit)|flit.vc<2 && flit.destination==0));
		assert!(simulation.ejected(towards_one).iter().all(|(_,flit)|flit.vc>=2 && flit.destination==2));
		assert!(simulation.is_idle());
	}
	///Two packets through a single virtual channel with slow links. Returns the arrival of the first tail, the cycle of the second VC grant
	///and whether the next virtual channel was kept in use during each cycle.
	fn back_to_back_packets(text:&str, latency:Time) -> (Time,Time,Vec<bool>)
	{
		let (mut simulation,router) = single_router(text,1,1,Rc::new(DestinationTag::with_vcs(1)));
		let injector = simulation.add_injector(0,0,1,4).unwrap();
		let ejector = simulation.add_ejector(0,0,latency).unwrap();
		for index in 0..2
		{
			for flit in packet(index*2,index,2,0,0)
			{
				simulation.inject(injector,flit);
			}
		}
		let mut second_grant = None;
		let mut in_use = vec![];
		for _ in 0..100
		{
			let cycle = simulation.cycle();
			simulation.step().unwrap();
			let router = router.borrow();
			in_use.push(router.next_buffer(0).used_by(0).is_some());
			if second_grant.is_none() && router.statistics().vc_grants==2
			{
				second_grant = Some(cycle);
			}
		}
		assert_eq!(check_packet_order(&simulation,1),vec![4]);
		let received = simulation.ejected(ejector);
		assert_eq!(received.iter().map(|(_,flit)|flit.id).collect::<Vec<usize>>(),vec![0,1,2,3]);
		assert!(simulation.is_idle());
		assert_eq!(router.borrow().next_buffer(0).used_by(0),None);
		(received[1].0,second_grant.expect("the second packet was never granted a virtual channel"),in_use)
	}
	#[test]
	fn tail_credit_releases_the_next_virtual_channel()
	{
		let latency = 6;
		let (tail_arrival,second_grant,in_use) = back_to_back_packets("IQRouter{num_vcs:1,wait_for_tail_credit:true}",latency);
		//The credit of the tail is sent by the ejector on arrival and read by the router `latency` cycles later.
		assert!(second_grant>=tail_arrival+latency,"granted at {} before the tail credit, sent at {}, came back",second_grant,tail_arrival);
		for cycle in tail_arrival..tail_arrival+latency
		{
			assert!(in_use[cycle as usize],"the virtual channel was released at cycle {} with the tail credit still in flight",cycle);
		}
		let (tail_arrival,second_grant,_) = back_to_back_packets("IQRouter{num_vcs:1}",latency);
		assert!(second_grant<tail_arrival+latency);
	}
	#[test]
	fn routers_are_built_from_their_configuration()
	{
		let cv = parse_configuration("InputQueued{num_vcs:2,vc_buf_size:8}").unwrap();
		let plugs = Plugs::default();
		let mut simulation = Simulation::new(context(1,&cv));
		let index = simulation.build_router(&cv,3,2,Rc::new(DestinationTag::with_vcs(2)),&plugs).unwrap();
		let router = simulation.router(index).borrow();
		assert_eq!(router.num_virtual_channels(),2);
		assert_eq!(router.info().inputs,3);
		assert_eq!(router.max_credits(0),vec![8,8,8,8]);
		assert_eq!(router.used_credits(),vec![0,0,0,0]);
	}
	#[test]
	fn statistics_are_aggregated_over_routers()
	{
		let (simulation,_router) = run_mixed("IQRouter{}");
		match simulation.aggregate_statistics()
		{
			Some(ConfigurationValue::Object(name,pairs)) =>
			{
				assert_eq!(name,"InputQueued");
				assert!(pairs.iter().any(|(field,value)|field=="sw_grants" && *value==ConfigurationValue::Number(32.0)));
			},
			_ => panic!("missing router statistics"),
		}
	}
}
